use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::pagination::OffsetWindow,
    application::repos::{CommentsRepo, CommentsWriteRepo, CreateCommentParams, RepoError},
    domain::entities::CommentRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = "id, content, author_id, post_id, created_at, updated_at, is_active";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    author_id: i64,
    post_id: i64,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    is_active: bool,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            post_id: row.post_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_active_for_post(
        &self,
        post_id: i64,
        window: OffsetWindow,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 AND is_active = TRUE \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .bind(i64::from(window.limit))
            .bind(i64::from(window.skip))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO comments (content, author_id, post_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(params.content)
            .bind(params.author_id)
            .bind(params.post_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "UPDATE comments SET content = $2, updated_at = $3 \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(content)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn deactivate_comment(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE comments SET is_active = FALSE, updated_at = $2 WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
