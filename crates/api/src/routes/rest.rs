//! REST transport adapter.
//!
//! Requests arrive as `/restful/{resource}[/{id}]`. Each request is
//! validated in order: method, then resource, then the operation for the
//! pair. Domain failures are mapped per operation by
//! [`ErrorMapping`](crate::error::ErrorMapping).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use domain::{
    ArticleId, ArticlePatch, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, ErrorCode, MAX_PAGE_SIZE,
    PageRequest, User,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::{ArticleStore, UserStore};

use super::AppState;
use crate::auth::Credentials;
use crate::error::{ApiError, ErrorMapping, json_response};

/// Path prefix the REST surface is mounted under.
pub const REST_PREFIX: &str = "/restful";

/// Routing limits for the REST surface, fixed at router construction.
#[derive(Debug, Clone)]
pub struct RestPolicy {
    pub resources: &'static [&'static str],
    pub methods: &'static [&'static str],
}

impl Default for RestPolicy {
    fn default() -> Self {
        Self {
            resources: &["users", "articles"],
            methods: &["GET", "POST", "PUT", "DELETE", "OPTIONS"],
        }
    }
}

/// Resources the REST surface serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Articles,
}

impl Resource {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "users" => Some(Resource::Users),
            "articles" => Some(Resource::Articles),
            _ => None,
        }
    }
}

/// A validated REST request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRoute {
    pub resource: Resource,
    pub id: Option<String>,
}

impl RestPolicy {
    /// Validates the method and resolves the path below [`REST_PREFIX`].
    ///
    /// Segments past the resource ID are ignored.
    pub fn route(&self, method: &Method, path: &str) -> Result<RestRoute, ApiError> {
        if !self.methods.contains(&method.as_str()) {
            return Err(ApiError::MethodNotAllowed(
                "Request method not allowed".to_string(),
            ));
        }

        let relative = path.strip_prefix(REST_PREFIX).unwrap_or(path);
        let mut segments = relative.trim_start_matches('/').split('/');
        let name = segments.next().unwrap_or_default();
        let resource = self
            .resources
            .contains(&name)
            .then(|| Resource::from_name(name))
            .flatten()
            .ok_or_else(|| ApiError::BadRequest("Requested resource not allowed".to_string()))?;
        let id = segments
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(RestRoute { resource, id })
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct ArticleRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<String>,
    size: Option<String>,
}

/// Single entry point for every method on `/restful/...`.
#[tracing::instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub async fn handle<S: UserStore + ArticleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match dispatch(&state, &method, &uri, &headers, &body).await {
        Ok(body) => encode(body),
        Err(err) => err.into_response(),
    }
}

/// 200 with a body, 204 without one.
fn encode(body: Option<Value>) -> Response {
    match body {
        Some(body) => json_response(StatusCode::OK, Some(&body)),
        None => json_response(StatusCode::NO_CONTENT, None),
    }
}

async fn dispatch<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Option<Value>, ApiError> {
    let route = state.policy.route(method, uri.path())?;

    match (route.resource, method.as_str(), route.id.as_deref()) {
        (Resource::Users, "POST", _) => register(state, body).await,
        (Resource::Articles, "POST", _) => create_article(state, headers, body).await,
        (Resource::Articles, "PUT", id) => edit_article(state, headers, id, body).await,
        (Resource::Articles, "DELETE", id) => delete_article(state, headers, id).await,
        (Resource::Articles, "GET", Some(id)) => view_article(state, id).await,
        (Resource::Articles, "GET", None) => list_articles(state, headers, uri).await,
        _ => Err(ApiError::MethodNotAllowed(
            "Request method not allowed".to_string(),
        )),
    }
}

async fn register<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    body: &[u8],
) -> Result<Option<Value>, ApiError> {
    let request: RegisterRequest = parse_body(body)?;
    let username = required(request.username, ErrorCode::UsernameEmpty)?;
    let password = required(request.password, ErrorCode::PasswordEmpty)?;

    let user = state
        .users
        .register(&username, &password)
        .await
        .map_err(|e| ErrorMapping::Register.to_api_error(e))?;
    to_body(&user)
}

async fn create_article<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Option<Value>, ApiError> {
    let request: ArticleRequest = parse_body(body)?;
    let title = required(request.title, ErrorCode::TitleEmpty)?;
    let content = required(request.content, ErrorCode::ContentEmpty)?;

    let user = authenticate(state, headers).await?;
    let article = state
        .articles
        .create(&title, &content, user.user_id)
        .await
        .map_err(|e| ErrorMapping::Create.to_api_error(e))?;
    to_body(&article)
}

async fn edit_article<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
    id: Option<&str>,
    body: &[u8],
) -> Result<Option<Value>, ApiError> {
    let user = authenticate(state, headers).await?;
    let article_id = article_id(id, ErrorMapping::Mutate)?;
    let article = state
        .articles
        .view(article_id)
        .await
        .map_err(|e| ErrorMapping::Mutate.to_api_error(e))?;
    if article.user_id != user.user_id {
        return Err(ApiError::Forbidden(
            "You are not allowed to edit this article".to_string(),
        ));
    }

    let request: ArticleRequest = parse_body(body)?;
    let patch = ArticlePatch {
        title: request.title,
        content: request.content,
    };
    let edited = state
        .articles
        .edit(article_id, patch, user.user_id)
        .await
        .map_err(|e| ErrorMapping::Mutate.to_api_error(e))?;
    to_body(&edited)
}

async fn delete_article<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
    id: Option<&str>,
) -> Result<Option<Value>, ApiError> {
    let user = authenticate(state, headers).await?;
    let article_id = article_id(id, ErrorMapping::Mutate)?;
    let article = state
        .articles
        .view(article_id)
        .await
        .map_err(|e| ErrorMapping::Mutate.to_api_error(e))?;
    if article.user_id != user.user_id {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this article".to_string(),
        ));
    }

    state
        .articles
        .delete(article_id, user.user_id)
        .await
        .map_err(|e| ErrorMapping::Mutate.to_api_error(e))?;
    Ok(None)
}

async fn view_article<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    id: &str,
) -> Result<Option<Value>, ApiError> {
    let article_id = article_id(Some(id), ErrorMapping::View)?;
    let article = state
        .articles
        .view(article_id)
        .await
        .map_err(|e| ErrorMapping::View.to_api_error(e))?;
    to_body(&article)
}

async fn list_articles<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Option<Value>, ApiError> {
    let user = authenticate(state, headers).await?;

    let Query(query) = Query::<ListQuery>::try_from_uri(uri)
        .map_err(|_| ApiError::BadRequest("Invalid query string".to_string()))?;
    let page = query_number(query.page, DEFAULT_PAGE)?;
    let size = query_number(query.size, DEFAULT_PAGE_SIZE)?;
    if size > MAX_PAGE_SIZE {
        return Err(ApiError::BadRequest(
            ErrorCode::PageSizeTooBig.message().to_string(),
        ));
    }

    let articles = state
        .articles
        .list(user.user_id, PageRequest::new(page, size))
        .await
        .map_err(|e| ErrorMapping::List.to_api_error(e))?;
    to_body(&articles)
}

async fn authenticate<S: UserStore + ArticleStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let credentials = Credentials::from_headers(headers);
    state
        .users
        .login(&credentials.username, &credentials.password)
        .await
        .map_err(|e| ErrorMapping::Authenticate.to_api_error(e))
}

fn article_id(raw: Option<&str>, mapping: ErrorMapping) -> Result<ArticleId, ApiError> {
    ArticleId::parse(raw.unwrap_or_default()).map_err(|e| mapping.to_api_error(e.into()))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Invalid request body".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

fn required(field: Option<String>, missing: ErrorCode) -> Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest(missing.message().to_string()))
}

fn query_number(raw: Option<String>, default: i64) -> Result<i64, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid paging parameter: {value}"))),
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Option<Value>, ApiError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| ApiError::Internal(e.to_string()))
}
