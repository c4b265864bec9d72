//! Storage for users and articles.
//!
//! Two async traits describe the tables the services need; an in-memory
//! implementation backs tests and local runs, and a PostgreSQL
//! implementation backs deployments.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod row;
pub mod store;

pub use common::{ArticleId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use row::{ArticleChanges, ArticleRow, NewArticle, NewUser, UserRow};
pub use store::{ArticleStore, UserStore};
