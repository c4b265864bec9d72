//! Shared types for the article API.

pub mod types;

pub use types::{ArticleId, ParseIdError, UserId};
