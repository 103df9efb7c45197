use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;

use crate::{
    application::pagination::OffsetWindow,
    application::repos::{
        CreatePostParams, PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError,
        UpdatePostParams,
    },
    domain::entities::PostRecord,
    domain::posts::resolve_published_at,
};

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.summary, p.is_published, p.published_at, \
                            p.author_id, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    summary: Option<String>,
    is_published: bool,
    published_at: Option<OffsetDateTime>,
    author_id: i64,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            is_published: row.is_published,
            published_at: row.published_at,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn apply_scope_conditions(qb: &mut QueryBuilder<'_, Postgres>, scope: PostListScope) {
        match scope {
            PostListScope::Published => {
                qb.push(" AND p.is_published = TRUE");
            }
            PostListScope::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
        }
    }

    fn apply_post_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostQueryFilter) {
        if let Some(tag_id) = filter.tag_id {
            qb.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ");
            qb.push_bind(tag_id);
            qb.push(")");
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{search}%");
            qb.push(" AND (p.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.content ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.summary ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    /// Link `tag_ids` to a post. Ids that name no tag are skipped.
    async fn link_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: i64,
        tag_ids: &[i64],
    ) -> Result<(), RepoError> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) \
             SELECT $1, t.id FROM tags t WHERE t.id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        window: OffsetWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1"));
        Self::apply_scope_conditions(&mut qb, scope);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(window.skip));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            content,
            summary,
            is_published,
            published_at,
            author_id,
            tag_ids,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let sql = format!(
            "INSERT INTO posts AS p (title, content, summary, is_published, published_at, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(title)
            .bind(content)
            .bind(summary)
            .bind(is_published)
            .bind(published_at)
            .bind(author_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Self::link_tags(&mut tx, row.id, &tag_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            content,
            summary,
            is_published,
            now,
            tag_ids,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // Lock the row so concurrent updates resolve against each other's
        // committed state.
        let sql = format!("SELECT {POST_COLUMNS} FROM posts AS p WHERE p.id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .map(PostRecord::from)
            .ok_or(RepoError::NotFound)?;

        let is_published = is_published.unwrap_or(current.is_published);
        let published_at = resolve_published_at(current.published_at, is_published, now);

        let sql = format!(
            "UPDATE posts AS p \
             SET title = $2, content = $3, summary = $4, is_published = $5, \
                 published_at = $6, updated_at = $7 \
             WHERE p.id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title.unwrap_or(current.title))
            .bind(content.unwrap_or(current.content))
            .bind(summary.or(current.summary))
            .bind(is_published)
            .bind(published_at)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(tag_ids) = tag_ids {
            sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            Self::link_tags(&mut tx, id, &tag_ids).await?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
