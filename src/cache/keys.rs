//! Cache key construction.
//!
//! Every key starts with an entity namespace so projections of different
//! kinds cannot collide. Key functions are pure; they never touch storage.

pub const POST_LIST_PREFIX: &str = "post:list:";
pub const POST_DETAIL_PREFIX: &str = "post:detail:";
pub const TAG_LIST_KEY: &str = "tag:list";
pub const COMMENTS_PREFIX: &str = "comments:";

const ALL_TAGS: &str = "all";
const NO_SEARCH: &str = "none";
const SEARCH_MARKER: &str = "q.";

/// Key for one page of the public post list.
///
/// The search term is percent-encoded behind a marker, so it can never
/// equal the `none` sentinel, introduce a `:` separator, or carry glob
/// metacharacters into pattern purges.
pub fn post_list(skip: u32, limit: u32, tag_id: Option<i64>, search: Option<&str>) -> String {
    let tag = match tag_id {
        Some(id) => id.to_string(),
        None => ALL_TAGS.to_string(),
    };
    let search = match search {
        Some(term) => format!("{SEARCH_MARKER}{}", urlencoding::encode(term)),
        None => NO_SEARCH.to_string(),
    };
    format!("{POST_LIST_PREFIX}{skip}:{limit}:{tag}:{search}")
}

pub fn post_detail(post_id: i64) -> String {
    format!("{POST_DETAIL_PREFIX}{post_id}")
}

pub fn tag_list() -> &'static str {
    TAG_LIST_KEY
}

pub fn comment_list(post_id: i64, skip: u32, limit: u32) -> String {
    format!("{COMMENTS_PREFIX}{post_id}:{skip}:{limit}")
}

/// Every page of the post list, whatever the filters.
pub fn post_list_pattern() -> String {
    format!("{POST_LIST_PREFIX}*")
}

pub fn post_detail_pattern() -> String {
    format!("{POST_DETAIL_PREFIX}*")
}

/// Every page of one post's comment list.
pub fn comment_list_pattern(post_id: i64) -> String {
    format!("{COMMENTS_PREFIX}{post_id}:*")
}

pub fn all_comment_lists_pattern() -> String {
    format!("{COMMENTS_PREFIX}*")
}
