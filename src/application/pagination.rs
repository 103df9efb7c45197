//! Offset pagination with per-endpoint bounds.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetWindow {
    pub skip: u32,
    pub limit: u32,
}

impl OffsetWindow {
    /// Slice an already materialised list down to this window.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// Limits accepted by a list endpoint.
#[derive(Debug, Clone, Copy)]
pub struct WindowBounds {
    pub default_limit: u32,
    pub max_limit: u32,
}

pub const POST_LIST_BOUNDS: WindowBounds = WindowBounds {
    default_limit: 10,
    max_limit: 100,
};

pub const COMMENT_LIST_BOUNDS: WindowBounds = WindowBounds {
    default_limit: 50,
    max_limit: 100,
};

pub const TAG_LIST_BOUNDS: WindowBounds = WindowBounds {
    default_limit: 100,
    max_limit: 100,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("skip must be greater than or equal to 0, got {0}")]
    NegativeSkip(i64),
    #[error("skip {0} exceeds the supported range")]
    SkipTooLarge(i64),
    #[error("limit must be between 1 and {max}, got {limit}")]
    LimitOutOfRange { limit: i64, max: u32 },
}

/// Raw `skip`/`limit` query parameters as sent by clients.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl WindowBounds {
    pub fn window(&self, query: PageQuery) -> Result<OffsetWindow, PaginationError> {
        let skip = query.skip.unwrap_or(0);
        if skip < 0 {
            return Err(PaginationError::NegativeSkip(skip));
        }
        let skip = u32::try_from(skip).map_err(|_| PaginationError::SkipTooLarge(skip))?;

        let limit = query.limit.unwrap_or(i64::from(self.default_limit));
        if limit < 1 || limit > i64::from(self.max_limit) {
            return Err(PaginationError::LimitOutOfRange {
                limit,
                max: self.max_limit,
            });
        }

        Ok(OffsetWindow {
            skip,
            limit: limit as u32,
        })
    }
}
