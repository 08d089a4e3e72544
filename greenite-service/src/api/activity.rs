//! Sustainable action, badge and bill comparison endpoints.
//!
//! These back the gated Play and Badges views, so each one needs a live
//! session.

use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::activity::{ActionEntry, BadgeFilter, BadgeSummary, BillAmounts, BillComparison};
use crate::api::AppState;
use crate::error::{I18nError, ServiceError};

/// Request body for POST /api/actions
#[derive(Debug, Deserialize)]
pub struct AddActionRequest {
    #[serde(default)]
    pub text: String,
}

/// Query parameters for GET /api/badges
#[derive(Debug, Default, Deserialize)]
pub struct BadgeQuery {
    #[serde(default)]
    pub filter: BadgeFilter,
}

/// GET /api/actions
pub async fn list_actions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActionEntry>>, I18nError> {
    let service = &state.service;
    service.require_session().map_err(|e| state.i18n_error(e))?;
    let actions = service.actions.actions().map_err(|e| state.i18n_error(e))?;
    Ok(Json(actions))
}

/// POST /api/actions
pub async fn add_action_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddActionRequest>,
) -> Result<(StatusCode, Json<ActionEntry>), I18nError> {
    let service = &state.service;
    service.require_session().map_err(|e| state.i18n_error(e))?;
    let entry = service
        .actions
        .add_action(&request.text)
        .map_err(|e| state.i18n_error(e))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/actions/upload - multipart with a single `file` field
///
/// The file is only inspected for its type and size and then dropped.
pub async fn upload_action_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ActionEntry>), I18nError> {
    let service = &state.service;
    service.require_session().map_err(|e| state.i18n_error(e))?;

    let mut upload: Option<(String, String, u64)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            state.i18n_error(ServiceError::InvalidRequest {
                message: e.to_string(),
            })
        })?;
        upload = Some((file_name, mime_type, data.len() as u64));
    }

    let (file_name, mime_type, size) = upload.ok_or_else(|| {
        state.i18n_error(ServiceError::InvalidRequest {
            message: "No file provided".to_string(),
        })
    })?;

    let entry = service
        .actions
        .add_upload(&file_name, &mime_type, size)
        .map_err(|e| state.i18n_error(e))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/badges?filter=all|unlocked|locked
pub async fn badges_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BadgeQuery>,
) -> Result<Json<BadgeSummary>, I18nError> {
    let service = &state.service;
    service.require_session().map_err(|e| state.i18n_error(e))?;
    let summary = service
        .actions
        .badge_summary(query.filter)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(summary))
}

/// POST /api/bills/compare
pub async fn compare_bills_handler(
    State(state): State<Arc<AppState>>,
    Json(bills): Json<BillAmounts>,
) -> Result<Json<BillComparison>, I18nError> {
    let service = &state.service;
    service.require_session().map_err(|e| state.i18n_error(e))?;
    let comparison = service
        .actions
        .compare_bills(bills)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(comparison))
}
