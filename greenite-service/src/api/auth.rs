//! Login, logout and session status endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::auth::{LoginOutcome, is_valid_email, password_len};
use crate::error::I18nError;

/// Request body for POST /api/auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for GET /api/auth/session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Request body for POST /api/auth/validate-email
#[derive(Debug, Deserialize)]
pub struct ValidateEmailRequest {
    #[serde(default)]
    pub email: String,
}

/// Response for the blur-time field checks
#[derive(Debug, Serialize)]
pub struct ValidateFieldResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request body for POST /api/auth/validate-password
#[derive(Debug, Deserialize)]
pub struct ValidatePasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /api/auth/login
///
/// Rejections come back as a 200 with `success: false`; only storage
/// failures produce an error status.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, I18nError> {
    let outcome = state
        .service
        .handle_login(&request.email, &request.password)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(outcome))
}

/// POST /api/auth/logout
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LogoutResponse>, I18nError> {
    state
        .service
        .sessions
        .logout()
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(LogoutResponse {
        message: state.service.i18n.get("en", "auth-logged-out", None),
    }))
}

/// GET /api/auth/session
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, I18nError> {
    let sessions = &state.service.sessions;
    let authenticated = sessions
        .is_authenticated()
        .map_err(|e| state.i18n_error(e))?;
    let user = if authenticated {
        sessions.current_user().map_err(|e| state.i18n_error(e))?
    } else {
        None
    };
    Ok(Json(SessionResponse {
        authenticated,
        user,
    }))
}

/// POST /api/auth/validate-email - blur-time hint, never blocks a submission
pub async fn validate_email_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateEmailRequest>,
) -> Json<ValidateFieldResponse> {
    let email = request.email.trim();
    // An empty field is left for the submit-time check
    let valid = email.is_empty() || is_valid_email(email);
    let message = (!valid).then(|| state.service.i18n.get("en", "error-email-invalid", None));
    Json(ValidateFieldResponse { valid, message })
}

/// POST /api/auth/validate-password - blur-time length hint
///
/// Advisory only. The login check applies the same minimum on its own.
pub async fn validate_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidatePasswordRequest>,
) -> Json<ValidateFieldResponse> {
    let min = state.service.runtime_config.dynamic().auth.min_password_len;
    let password = request.password;
    let valid = password.is_empty() || password_len(&password) >= min;
    let message = (!valid).then(|| {
        state
            .service
            .i18n
            .format("en", "error-password-short", &[("min", &min.to_string())])
    });
    Json(ValidateFieldResponse { valid, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;

    #[tokio::test]
    async fn test_login_then_session_then_logout() {
        let state = test_state();

        let Json(session) = session_handler(State(state.clone())).await.ok().unwrap();
        assert!(!session.authenticated);

        let Json(outcome) = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                email: "adminITE@user.com.sg".to_string(),
                password: "admin1234".to_string(),
            }),
        )
        .await
        .ok()
        .unwrap();
        assert!(outcome.success);

        let Json(session) = session_handler(State(state.clone())).await.ok().unwrap();
        assert!(session.authenticated);
        assert_eq!(session.user.as_deref(), Some("adminITE@user.com.sg"));

        logout_handler(State(state.clone())).await.ok().unwrap();
        let Json(session) = session_handler(State(state)).await.ok().unwrap();
        assert!(!session.authenticated);
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_an_http_error() {
        let state = test_state();

        let Json(outcome) = login_handler(
            State(state),
            Json(LoginRequest {
                email: "adminITE@user.com.sg".to_string(),
                password: "wrongpass".to_string(),
            }),
        )
        .await
        .ok()
        .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some("invalid_credentials"));
    }

    #[tokio::test]
    async fn test_validate_email_is_advisory() {
        let state = test_state();

        let check = |email: &str| ValidateEmailRequest {
            email: email.to_string(),
        };

        let Json(response) = validate_email_handler(State(state.clone()), Json(check("a@b.co"))).await;
        assert!(response.valid);

        let Json(response) = validate_email_handler(State(state.clone()), Json(check(""))).await;
        assert!(response.valid);

        let Json(response) = validate_email_handler(State(state), Json(check("nope"))).await;
        assert!(!response.valid);
        assert_eq!(
            response.message.as_deref(),
            Some("Please enter a valid email address")
        );
    }

    #[tokio::test]
    async fn test_validate_password_follows_minimum_length() {
        let state = test_state();

        let check = |password: &str| {
            Json(ValidatePasswordRequest {
                password: password.to_string(),
            })
        };

        let Json(response) = validate_password_handler(State(state.clone()), check("")).await;
        assert!(response.valid);

        let Json(response) = validate_password_handler(State(state.clone()), check("abc")).await;
        assert!(!response.valid);
        assert_eq!(
            response.message.as_deref(),
            Some("Password must be at least 6 characters")
        );

        let Json(response) = validate_password_handler(State(state.clone()), check("abcdef")).await;
        assert!(response.valid);
        assert!(response.message.is_none());

        // Tracks the runtime minimum
        let mut updates = std::collections::HashMap::new();
        updates.insert("auth.min_password_len".to_string(), serde_json::json!(8));
        state.service.update_settings(updates).unwrap();

        let Json(response) = validate_password_handler(State(state), check("abcdef")).await;
        assert!(!response.valid);
        assert_eq!(
            response.message.as_deref(),
            Some("Password must be at least 8 characters")
        );
    }
}
