use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::{ApiError, ApiResult};
use super::extract::SubmissionPayload;
use crate::server::AppState;
use crate::submission::RequestContext;
use crate::{Acknowledgment, Error};

/// Rows returned by the admin listing
pub const RECENT_SUBMISSIONS_LIMIT: usize = 500;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

/// `POST /api/submit-form`
///
/// 400 only when the submission has no email and no phone. Everything past
/// validation is acknowledged with 200 and `success: true`, including
/// submissions that could not be stored anywhere.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    SubmissionPayload(raw): SubmissionPayload,
) -> ApiResult<Json<Acknowledgment>> {
    match state.ingest.submit(raw, ctx).await {
        Ok(ack) => Ok(Json(ack)),
        Err(Error::MissingContact) => Err(ApiError::Validation(Error::MissingContact.to_string())),
        Err(e) => {
            tracing::error!("Form submission error: {}", e);
            Ok(Json(Acknowledgment {
                success: true,
                message: "Form received. Our team will contact you shortly.".to_string(),
                id: None,
                fallback: None,
            }))
        }
    }
}

/// `GET /api/submissions`, the most recent rows of the Relational Store.
/// Only mounted when an admin token is configured.
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let expected = state.admin_token.as_deref().ok_or(ApiError::Unauthorized)?;
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;
    let authorized: bool = supplied.trim().as_bytes().ct_eq(expected.as_bytes()).into();
    if !authorized {
        return Err(ApiError::Unauthorized);
    }

    let store = state.store.as_ref().ok_or_else(|| {
        tracing::error!("Fetch error: no database configured");
        ApiError::Internal
    })?;

    let rows = store
        .recent_submissions(RECENT_SUBMISSIONS_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!("Fetch error: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(serde_json::json!({ "success": true, "data": rows })))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Page not found")
}
