//! RPC transport adapter.
//!
//! Operations are invoked by name with positional string arguments. Every
//! domain outcome, failures included, is reported as a JSON envelope whose
//! `code` field is `0` on success or the `ErrorCode` on failure. Only
//! problems with the call itself (unknown operation, wrong argument count,
//! unreadable numbers) are reported as [`RpcFault`].

use domain::{
    ArticleId, ArticlePatch, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PageRequest, ServiceError, User,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use store::{ArticleStore, UserStore};
use thiserror::Error;

use crate::auth::Credentials;
use crate::routes::AppState;

/// Operations exposed over RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    UserRegister,
    ArticleCreate,
    ArticleEdit,
    ArticleDelete,
    ArticleView,
    ArticleList,
}

impl RpcMethod {
    const ALL: [RpcMethod; 6] = [
        RpcMethod::UserRegister,
        RpcMethod::ArticleCreate,
        RpcMethod::ArticleEdit,
        RpcMethod::ArticleDelete,
        RpcMethod::ArticleView,
        RpcMethod::ArticleList,
    ];

    /// Looks an operation up by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Returns the wire name.
    pub fn name(self) -> &'static str {
        match self {
            RpcMethod::UserRegister => "userRegister",
            RpcMethod::ArticleCreate => "articleCreate",
            RpcMethod::ArticleEdit => "articleEdit",
            RpcMethod::ArticleDelete => "articleDelete",
            RpcMethod::ArticleView => "articleView",
            RpcMethod::ArticleList => "articleList",
        }
    }

    /// Returns the accepted number of positional arguments.
    fn arity(self) -> (usize, usize) {
        match self {
            RpcMethod::UserRegister | RpcMethod::ArticleCreate => (2, 2),
            RpcMethod::ArticleEdit => (3, 3),
            RpcMethod::ArticleDelete | RpcMethod::ArticleView => (1, 1),
            RpcMethod::ArticleList => (0, 2),
        }
    }
}

/// A malformed call, as opposed to a domain failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RpcFault {
    #[error("Unknown operation: {0}")]
    UnknownMethod(String),

    #[error("{method} expects {min} to {max} arguments, got {got}")]
    Arity {
        method: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("Argument {name} must be an integer, got {value:?}")]
    NotAnInteger { name: &'static str, value: String },
}

/// Invokes an operation by wire name.
pub async fn call<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    name: &str,
    args: &[String],
    credentials: &Credentials,
) -> Result<Value, RpcFault> {
    let method =
        RpcMethod::from_name(name).ok_or_else(|| RpcFault::UnknownMethod(name.to_string()))?;
    dispatch(state, method, args, credentials).await
}

/// Invokes an operation.
#[tracing::instrument(skip_all, fields(method = method.name(), args = args.len()))]
pub async fn dispatch<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    method: RpcMethod,
    args: &[String],
    credentials: &Credentials,
) -> Result<Value, RpcFault> {
    let (min, max) = method.arity();
    if args.len() < min || args.len() > max {
        return Err(RpcFault::Arity {
            method: method.name(),
            min,
            max,
            got: args.len(),
        });
    }
    metrics::counter!("rpc_calls_total", "method" => method.name()).increment(1);

    let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();

    let outcome = match method {
        RpcMethod::UserRegister => user_register(state, arg(0), arg(1)).await,
        RpcMethod::ArticleCreate => article_create(state, credentials, arg(0), arg(1)).await,
        RpcMethod::ArticleEdit => article_edit(state, credentials, arg(0), arg(1), arg(2)).await,
        RpcMethod::ArticleDelete => article_delete(state, credentials, arg(0)).await,
        RpcMethod::ArticleView => article_view(state, arg(0)).await,
        RpcMethod::ArticleList => {
            let page = integer_arg("page", arg(0), DEFAULT_PAGE)?;
            let size = integer_arg("size", arg(1), DEFAULT_PAGE_SIZE)?;
            article_list(state, credentials, PageRequest::new(page, size)).await
        }
    };

    Ok(outcome.unwrap_or_else(|err| failure(&err)))
}

async fn user_register<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    username: &str,
    password: &str,
) -> Result<Value, ServiceError> {
    state.users.register(username, password).await?;
    Ok(message("Registration successful"))
}

async fn article_create<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    credentials: &Credentials,
    title: &str,
    content: &str,
) -> Result<Value, ServiceError> {
    let user = login(state, credentials).await?;
    let article = state.articles.create(title, content, user.user_id).await?;
    Ok(success(&article))
}

async fn article_edit<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    credentials: &Credentials,
    article_id: &str,
    title: &str,
    content: &str,
) -> Result<Value, ServiceError> {
    let user = login(state, credentials).await?;
    let article_id = ArticleId::parse(article_id)?;
    let article = state
        .articles
        .edit(
            article_id,
            ArticlePatch::from_positional(title, content),
            user.user_id,
        )
        .await?;
    Ok(success(&article))
}

async fn article_delete<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    credentials: &Credentials,
    article_id: &str,
) -> Result<Value, ServiceError> {
    let user = login(state, credentials).await?;
    let article_id = ArticleId::parse(article_id)?;
    state.articles.delete(article_id, user.user_id).await?;
    Ok(message("Article deleted"))
}

async fn article_view<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    article_id: &str,
) -> Result<Value, ServiceError> {
    let article_id = ArticleId::parse(article_id)?;
    let article = state.articles.view(article_id).await?;
    Ok(success(&article))
}

async fn article_list<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    credentials: &Credentials,
    page: PageRequest,
) -> Result<Value, ServiceError> {
    let user = login(state, credentials).await?;
    let list = state.articles.list(user.user_id, page).await?;
    Ok(json!({ "list": list, "code": 0 }))
}

async fn login<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    credentials: &Credentials,
) -> Result<User, ServiceError> {
    state
        .users
        .login(&credentials.username, &credentials.password)
        .await
}

fn integer_arg(name: &'static str, raw: &str, default: i64) -> Result<i64, RpcFault> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed.parse().map_err(|_| RpcFault::NotAnInteger {
        name,
        value: raw.to_string(),
    })
}

/// `{...fields, code: 0}`
fn success<T: Serialize>(value: &T) -> Value {
    let mut fields = match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            let mut fields = Map::new();
            fields.insert("result".to_string(), other);
            fields
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode rpc result");
            return failure(&ServiceError::new(domain::ErrorCode::ServerError));
        }
    };
    fields.insert("code".to_string(), json!(0));
    Value::Object(fields)
}

/// `{message, code: 0}`
fn message(text: &str) -> Value {
    json!({ "message": text, "code": 0 })
}

/// `{message, code}`
fn failure(err: &ServiceError) -> Value {
    json!({ "message": err.message(), "code": err.code().code() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for method in RpcMethod::ALL {
            assert_eq!(RpcMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(RpcMethod::from_name("articleDestroy"), None);
    }

    #[test]
    fn integer_args_default_when_blank() {
        assert_eq!(integer_arg("page", "", 1), Ok(1));
        assert_eq!(integer_arg("page", " 4 ", 1), Ok(4));
        assert!(matches!(
            integer_arg("size", "ten", 10),
            Err(RpcFault::NotAnInteger { name: "size", .. })
        ));
    }

    #[test]
    fn envelopes_carry_code() {
        assert_eq!(message("ok"), json!({ "message": "ok", "code": 0 }));
        assert_eq!(
            failure(&ServiceError::new(domain::ErrorCode::ArticleNotFound)),
            json!({ "message": "Article not found", "code": 10 })
        );
        assert_eq!(
            success(&json!({ "title": "T" })),
            json!({ "title": "T", "code": 0 })
        );
    }
}
