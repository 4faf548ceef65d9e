//! Error types for the lending server

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes reported alongside every error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Failure,
    NotAuthorized,
    DbFailure,
    NoSuchData,
    BadValue,
    Duplicate,
    BookNotAvailable,
    AlreadyBorrowed,
    NothingToReturn,
}

/// Loan lifecycle rule violations.
///
/// Messages are shown to end users as-is by the presentation layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanError {
    #[error("This book is currently not available.")]
    Unavailable,

    #[error("You already borrowed this book and haven't returned it.")]
    AlreadyBorrowed,

    #[error("You already returned this book or never borrowed it.")]
    NothingToReturn,
}

impl LoanError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoanError::Unavailable => ErrorCode::BookNotAvailable,
            LoanError::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
            LoanError::NothingToReturn => ErrorCode::NothingToReturn,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Loan rejected: {0}")]
    Loan(#[from] LoanError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
    /// Error code name
    pub code: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Loan(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Loan(e) => e.code(),
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let message = match &self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Loan(e) => e.to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: format!("{:?}", code),
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
