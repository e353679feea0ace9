//! HTTP surface of the badge engine.
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::engine::BadgeEngine;
use crate::error::BadgeError;
use crate::model::{
    BadgeRequest, BadgeType, Eligibility, NewBadgeRequest, ReconcileReport, RequestFilter,
    SweepReport,
};

type AppState = Arc<BadgeEngine>;

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub approver_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub approver_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpireEarlyBody {
    /// Defaults to now.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TierBody {
    pub tier: String,
}

#[derive(Debug, Deserialize)]
pub struct SweepParams {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct TierView {
    recruiter_id: String,
    tier: String,
}

impl IntoResponse for BadgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BadgeError::EligibilityExceeded { .. }
            | BadgeError::InvalidStateTransition { .. }
            | BadgeError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
            BadgeError::PaymentNotConfirmed => StatusCode::PAYMENT_REQUIRED,
            BadgeError::RequestNotFound(_) => StatusCode::NOT_FOUND,
            BadgeError::InvalidRequest(_) | BadgeError::UnknownTier(_) => StatusCode::BAD_REQUEST,
            BadgeError::ProjectionFailed { .. }
            | BadgeError::Storage(_)
            | BadgeError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(err = %self, "request failed");
        }
        let body = Json(json!({ "error": self.public_message(), "code": self.code() }));
        (status, body).into_response()
    }
}

pub fn router(engine: Arc<BadgeEngine>) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route(
            "/api/v1/recruiters/:recruiter_id/eligibility/:badge_type",
            get(eligibility_handler),
        )
        .route("/api/v1/recruiters/:recruiter_id/tier", put(tier_handler))
        .route(
            "/api/v1/badge-requests",
            post(create_handler).get(list_handler),
        )
        .route("/api/v1/badge-requests/:id", get(get_handler))
        .route("/api/v1/badge-requests/:id/approve", post(approve_handler))
        .route("/api/v1/badge-requests/:id/reject", post(reject_handler))
        .route(
            "/api/v1/badge-requests/:id/expire-early",
            post(expire_early_handler),
        )
        .route("/api/v1/sweep", post(sweep_handler))
        .route("/api/v1/reconcile", post(reconcile_handler))
        .with_state(engine)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn parse_badge(raw: &str) -> Result<BadgeType, BadgeError> {
    BadgeType::parse(raw)
        .ok_or_else(|| BadgeError::InvalidRequest(format!("unknown badge type {raw}")))
}

async fn eligibility_handler(
    State(engine): State<AppState>,
    Path((recruiter_id, badge_type)): Path<(String, String)>,
) -> Result<Json<Eligibility>, BadgeError> {
    let badge = parse_badge(&badge_type)?;
    let eligibility = engine
        .check_eligibility(&recruiter_id, badge, Utc::now())
        .await?;
    Ok(Json(eligibility))
}

async fn tier_handler(
    State(engine): State<AppState>,
    Path(recruiter_id): Path<String>,
    Json(body): Json<TierBody>,
) -> Result<Json<TierView>, BadgeError> {
    engine.set_recruiter_tier(&recruiter_id, &body.tier).await?;
    Ok(Json(TierView {
        recruiter_id,
        tier: body.tier,
    }))
}

async fn create_handler(
    State(engine): State<AppState>,
    Json(body): Json<NewBadgeRequest>,
) -> Result<(StatusCode, Json<BadgeRequest>), BadgeError> {
    let created = engine.create_request(body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_handler(
    State(engine): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<BadgeRequest>>, BadgeError> {
    Ok(Json(engine.list_requests(&filter).await?))
}

async fn get_handler(
    State(engine): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BadgeRequest>, BadgeError> {
    Ok(Json(engine.get_request(&id).await?))
}

async fn approve_handler(
    State(engine): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<BadgeRequest>, BadgeError> {
    let approved = engine
        .approve_request(&id, &body.approver_id, body.notes.as_deref(), Utc::now())
        .await?;
    Ok(Json(approved))
}

async fn reject_handler(
    State(engine): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Result<Json<BadgeRequest>, BadgeError> {
    let rejected = engine
        .reject_request(&id, &body.approver_id, &body.reason, Utc::now())
        .await?;
    Ok(Json(rejected))
}

async fn expire_early_handler(
    State(engine): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExpireEarlyBody>,
) -> Result<Json<BadgeRequest>, BadgeError> {
    let now = Utc::now();
    let updated = engine
        .expire_early(&id, body.ends_at.unwrap_or(now), now)
        .await?;
    Ok(Json(updated))
}

async fn sweep_handler(
    State(engine): State<AppState>,
    Query(params): Query<SweepParams>,
) -> Json<SweepReport> {
    Json(engine.sweep(params.now.unwrap_or_else(Utc::now)).await)
}

async fn reconcile_handler(
    State(engine): State<AppState>,
) -> Result<Json<ReconcileReport>, BadgeError> {
    Ok(Json(engine.reconcile(Utc::now()).await?))
}
