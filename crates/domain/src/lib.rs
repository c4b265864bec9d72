//! Domain layer for the article API.
//!
//! This crate provides:
//! - The `ErrorCode` catalog shared by every transport
//! - `UserService` for registration and credential checks
//! - `ArticleService` for article CRUD with ownership checks and paging

pub mod article;
pub mod error;
pub mod user;

pub use article::{
    Article, ArticlePatch, ArticleService, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
    PageRequest,
};
pub use common::{ArticleId, UserId};
pub use error::{ErrorCode, ServiceError};
pub use user::{Argon2Hasher, PasswordError, PasswordHasher, User, UserService};
