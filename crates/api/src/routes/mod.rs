//! HTTP routes and the state they share.

pub mod health;
pub mod metrics;
pub mod rest;
pub mod soap;

use domain::{ArticleService, UserService};
use store::{ArticleStore, UserStore};

use rest::RestPolicy;

/// Shared application state accessible from all handlers.
///
/// Holds no per-request data; every handler reads it immutably.
pub struct AppState<S: UserStore + ArticleStore> {
    pub users: UserService<S>,
    pub articles: ArticleService<S>,
    pub policy: RestPolicy,
}
