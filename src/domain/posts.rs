//! Publication rules for posts.

use time::OffsetDateTime;

/// Resolve the `published_at` value after a write.
///
/// The timestamp is stamped on the first transition to published and kept
/// forever after, including across later unpublish/republish cycles.
pub fn resolve_published_at(
    current: Option<OffsetDateTime>,
    is_published: bool,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    match current {
        Some(first) => Some(first),
        None if is_published => Some(now),
        None => None,
    }
}
