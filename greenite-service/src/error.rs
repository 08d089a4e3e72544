use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::i18n::I18n;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Rejections produced by the login flow.
///
/// The display strings are the English user-facing messages; `InvalidCredentials`
/// never says which of email or password was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{reason}")]
    Validation {
        field: CredentialField,
        reason: String,
    },

    #[error("Too many login attempts. Please try again later.")]
    RateLimited { action: String },

    #[error("Account temporarily locked due to multiple failed attempts")]
    AccountLocked,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Which login input a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    Email,
    Password,
}

impl AuthError {
    pub fn email_required() -> Self {
        AuthError::Validation {
            field: CredentialField::Email,
            reason: "Email is required".to_string(),
        }
    }

    pub fn email_malformed() -> Self {
        AuthError::Validation {
            field: CredentialField::Email,
            reason: "Please enter a valid email address".to_string(),
        }
    }

    pub fn password_required() -> Self {
        AuthError::Validation {
            field: CredentialField::Password,
            reason: "Password is required".to_string(),
        }
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed")]
    Serialization(#[source] serde_json::Error),
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Auth(AuthError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ServiceError::Auth(AuthError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Auth(AuthError::AccountLocked) => StatusCode::FORBIDDEN,
            ServiceError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Auth(AuthError::Validation { .. }) => "validation_error",
            ServiceError::Auth(AuthError::RateLimited { .. }) => "rate_limited",
            ServiceError::Auth(AuthError::AccountLocked) => "account_locked",
            ServiceError::Auth(AuthError::InvalidCredentials) => "invalid_credentials",
            ServiceError::Database(_) => "database_error",
            ServiceError::NotAuthenticated => "not_authenticated",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            ServiceError::Auth(AuthError::Validation { reason, .. }) => reason.clone(),
            ServiceError::Auth(AuthError::RateLimited { .. }) => {
                i18n.get(locale, "error-rate-limited", None)
            }
            ServiceError::Auth(AuthError::AccountLocked) => {
                i18n.get(locale, "error-account-locked", None)
            }
            ServiceError::Auth(AuthError::InvalidCredentials) => {
                i18n.get(locale, "error-invalid-credentials", None)
            }
            ServiceError::NotAuthenticated => i18n.get(locale, "error-not-authenticated", None),
            ServiceError::InvalidRequest { message } => message.clone(),
            ServiceError::Database(_) | ServiceError::Internal { .. } => {
                i18n.get(locale, "error-internal", None)
            }
            // For other errors, fall back to the technical message
            _ => self.to_string(),
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n, locale: &str) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        let message = self.user_message(i18n, locale);

        let response = ErrorResponse {
            message,
            code: Some(code),
            details: None,
        };

        (status, Json(response)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
            details: None,
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: std::sync::Arc<I18n>,
    pub locale: String,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: std::sync::Arc<I18n>, locale: impl Into<String>) -> Self {
        Self {
            error,
            i18n,
            locale: locale.into(),
        }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        self.error.into_response_with_i18n(&self.i18n, &self.locale)
    }
}
