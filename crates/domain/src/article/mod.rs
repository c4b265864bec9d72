//! Articles, edit patches and paging.

mod service;

pub use service::ArticleService;

use common::{ArticleId, UserId};
use serde::Serialize;
use store::ArticleRow;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Page used when the caller gives none.
pub const DEFAULT_PAGE: i64 = 1;
/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// An article as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub article_id: ArticleId,
    pub title: String,
    pub content: String,
    pub user_id: UserId,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Self {
            article_id: row.article_id,
            title: row.title,
            content: row.content,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Fields to change on an article.
///
/// `None` keeps the stored value. An explicit empty string is rejected,
/// since titles and content are never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl ArticlePatch {
    /// Creates a patch that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the new title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the new content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Builds a patch from positional arguments where an empty string
    /// means the argument was not supplied.
    pub fn from_positional(title: &str, content: &str) -> Self {
        let given = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            title: given(title),
            content: given(content),
        }
    }
}

/// A page of a user's article list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// One-based page number. Values below 1 read the first page.
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    /// Returns the number of rows to skip, never negative.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.size).max(0)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}
