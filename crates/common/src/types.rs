use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a registered user.
///
/// Wraps the storage key to keep user IDs from being mixed up
/// with article IDs at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user ID from a raw storage key.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying storage key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(i64);

impl ArticleId {
    /// Creates an article ID from a raw storage key.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying storage key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Parses an article ID received as text from a transport.
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, ParseIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError::Empty);
        }
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ParseIdError::Invalid(trimmed.to_string()))
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ArticleId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ArticleId> for i64 {
    fn from(id: ArticleId) -> Self {
        id.0
    }
}

/// Error returned when an identifier received as text cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    /// No identifier was supplied.
    #[error("identifier is empty")]
    Empty,
    /// The identifier is not a valid storage key.
    #[error("invalid identifier: {0}")]
    Invalid(String),
}
