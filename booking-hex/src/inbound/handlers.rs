//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::OpenApi;

use booking_repo::security::{DEFAULT_SIGNATURE_TOLERANCE_SECS, verify_signature};
use booking_types::{AppError, BookingRepository, CheckoutRequest, ProviderEvent, WebhookAck};

use super::auth::{CurrentUser, require_admin};
use crate::BookingService;
use crate::openapi::ApiDoc;

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// How inbound provider events are authenticated.
#[derive(Debug, Clone)]
pub struct WebhookVerification {
    /// Signing secret; `None` accepts unsigned events
    pub secret: Option<String>,
    /// Maximum signature age in seconds; non-positive disables the check
    pub tolerance_secs: i64,
}

impl Default for WebhookVerification {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
        }
    }
}

impl WebhookVerification {
    pub fn signed(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: Some(secret.into()),
            tolerance_secs,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState<R: BookingRepository> {
    pub service: BookingService<R>,
    pub webhook: WebhookVerification,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// List bookable services.
#[tracing::instrument(skip(state))]
pub async fn list_services<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let services = state.service.list_services().await?;
    Ok(Json(services))
}

// ─────────────────────────────────────────────────────────────────────────────
// Checkout
// ─────────────────────────────────────────────────────────────────────────────

/// Start a hosted checkout for the signed-in customer.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.0.id))]
pub async fn create_checkout<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let checkout = state.service.create_checkout(&user.0, req).await?;
    Ok(Json(checkout))
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook
// ─────────────────────────────────────────────────────────────────────────────

/// Receive a payment provider event.
///
/// Only unparseable or unauthenticated bodies are rejected; every parsed
/// event is acknowledged whatever its processing outcome.
#[tracing::instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn receive_webhook<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    match &state.webhook.secret {
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok());
            verify_signature(
                &body,
                signature,
                secret,
                state.webhook.tolerance_secs,
                Utc::now().timestamp(),
            )
            .map_err(|e| {
                tracing::warn!(error = %e, "rejecting webhook with invalid signature");
                AppError::BadRequest(format!("Webhook Error: {}", e))
            })?;
        }
        None => {
            tracing::warn!("webhook signature verification is disabled (no signing secret)");
        }
    }

    let event: ProviderEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejecting unparseable webhook body");
        AppError::BadRequest(format!("JSON Parse Error: {}", e))
    })?;

    let event_id = event.id.clone();
    let outcome = state.service.handle_payment_event(event).await;
    tracing::info!(event_id = %event_id, outcome = outcome.kind(), "webhook processed");

    Ok(Json(WebhookAck::received()))
}

/// Liveness probe for the webhook route.
pub async fn webhook_status() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "endpoint": "webhook" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

/// List all reservations, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn list_reservations<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user.0)?;
    let reservations = state.service.list_reservations().await?;
    Ok(Json(reservations))
}

#[derive(Debug, Deserialize)]
pub struct DeadLetterQuery {
    pub limit: Option<i64>,
}

/// List dead-lettered payment events, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn list_dead_letters<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DeadLetterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&user.0)?;
    let letters = state
        .service
        .list_dead_letters(query.limit.unwrap_or(50))
        .await?;
    Ok(Json(letters))
}
