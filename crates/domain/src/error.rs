//! Domain error catalog.

use common::ParseIdError;
use store::StoreError;
use thiserror::Error;

/// Stable numeric codes for every domain failure.
///
/// The integers are part of the wire contract: the RPC transport echoes
/// them verbatim, and the REST transport maps them to HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    UsernameExists = 1,
    PasswordEmpty = 2,
    UsernameEmpty = 3,
    RegisterFailed = 4,
    InvalidCredentials = 5,
    TitleEmpty = 6,
    ContentEmpty = 7,
    CreateFailed = 8,
    ArticleIdEmpty = 9,
    ArticleNotFound = 10,
    PermissionDenied = 11,
    EditFailed = 12,
    DeleteFailed = 13,
    PageSizeTooBig = 14,
    ServerError = 15,
}

impl ErrorCode {
    /// Returns the integer sent over the wire.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns the human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::UsernameExists => "Username already exists",
            ErrorCode::PasswordEmpty => "Password cannot be empty",
            ErrorCode::UsernameEmpty => "Username cannot be empty",
            ErrorCode::RegisterFailed => "Registration failed",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TitleEmpty => "Article title cannot be empty",
            ErrorCode::ContentEmpty => "Article content cannot be empty",
            ErrorCode::CreateFailed => "Failed to create article",
            ErrorCode::ArticleIdEmpty => "Article ID cannot be empty",
            ErrorCode::ArticleNotFound => "Article not found",
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::EditFailed => "Failed to edit article",
            ErrorCode::DeleteFailed => "Failed to delete article",
            ErrorCode::PageSizeTooBig => "Page size cannot exceed 100",
            ErrorCode::ServerError => "Internal server error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A domain failure: a catalog code plus, for storage failures, the cause.
///
/// The cause is for logs only; transports show the code's message.
#[derive(Debug, Error)]
#[error("{code}")]
pub struct ServiceError {
    code: ErrorCode,
    #[source]
    source: Option<StoreError>,
}

impl ServiceError {
    /// Creates an error without an underlying cause.
    pub fn new(code: ErrorCode) -> Self {
        Self { code, source: None }
    }

    /// Creates an error for a failed storage round-trip and logs the cause.
    pub fn storage(code: ErrorCode, err: StoreError) -> Self {
        tracing::error!(error = %err, code = code.code(), "storage operation failed");
        Self {
            code,
            source: Some(err),
        }
    }

    /// Returns the catalog code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &'static str {
        self.code.message()
    }
}

impl From<ErrorCode> for ServiceError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

impl From<ParseIdError> for ServiceError {
    fn from(err: ParseIdError) -> Self {
        match err {
            ParseIdError::Empty => Self::new(ErrorCode::ArticleIdEmpty),
            // A key that cannot exist behaves like one that does not.
            ParseIdError::Invalid(_) => Self::new(ErrorCode::ArticleNotFound),
        }
    }
}
