//! API error types with HTTP response mapping.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use domain::{ErrorCode, ServiceError};

/// Content type of every REST response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input.
    BadRequest(String),
    /// Missing or wrong credentials.
    Unauthorized(String),
    /// Caller does not own the resource.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// HTTP method not accepted for the resource.
    MethodNotAllowed(String),
    /// Resource already exists.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::METHOD_NOT_ALLOWED => ApiError::MethodNotAllowed(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                msg
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::Conflict(msg) => msg,
        };

        json_response(status, Some(&serde_json::json!({ "error": message })))
    }
}

/// Builds a JSON response. Non-ASCII text is written as UTF-8, unescaped.
pub fn json_response(status: StatusCode, body: Option<&serde_json::Value>) -> Response {
    let bytes = match body.map(serde_json::to_vec).transpose() {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        )],
        bytes,
    )
        .into_response()
}

/// Which REST operation a domain failure came from.
///
/// Each operation has its own table from `ErrorCode` to HTTP status, so a
/// code never doubles as a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMapping {
    /// Credential check ahead of an authenticated operation.
    Authenticate,
    /// `POST /users`.
    Register,
    /// `POST /articles`.
    Create,
    /// `PUT` and `DELETE` on `/articles/{id}`.
    Mutate,
    /// `GET /articles/{id}`.
    View,
    /// `GET /articles`.
    List,
}

impl ErrorMapping {
    /// Returns the HTTP status this operation reports for `code`.
    pub fn status(self, code: ErrorCode) -> StatusCode {
        use ErrorCode as E;

        match (self, code) {
            (
                ErrorMapping::Authenticate,
                E::UsernameEmpty | E::PasswordEmpty | E::InvalidCredentials,
            ) => StatusCode::UNAUTHORIZED,
            (ErrorMapping::Authenticate, _) => StatusCode::INTERNAL_SERVER_ERROR,

            (ErrorMapping::Register, E::UsernameExists) => StatusCode::CONFLICT,
            (ErrorMapping::Register, E::UsernameEmpty | E::PasswordEmpty) => {
                StatusCode::BAD_REQUEST
            }
            (ErrorMapping::Register, _) => StatusCode::INTERNAL_SERVER_ERROR,

            (ErrorMapping::Create, E::TitleEmpty | E::ContentEmpty) => StatusCode::BAD_REQUEST,
            (ErrorMapping::Create, _) => StatusCode::INTERNAL_SERVER_ERROR,

            (ErrorMapping::Mutate, E::ArticleNotFound) => StatusCode::NOT_FOUND,
            (ErrorMapping::Mutate, E::PermissionDenied) => StatusCode::FORBIDDEN,
            (ErrorMapping::Mutate, _) => StatusCode::BAD_REQUEST,

            (ErrorMapping::View, E::ArticleNotFound) => StatusCode::NOT_FOUND,
            (ErrorMapping::View, _) => StatusCode::INTERNAL_SERVER_ERROR,

            (ErrorMapping::List, E::PageSizeTooBig) => StatusCode::BAD_REQUEST,
            (ErrorMapping::List, _) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts a domain failure into the API error for this operation.
    pub fn to_api_error(self, err: ServiceError) -> ApiError {
        ApiError::from_status(self.status(err.code()), err.message().to_string())
    }
}
