use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Organizer;
use crate::models::PayoutRequest;
use crate::services::payout::{self, PayoutDetails, PayoutInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payouts", post(request_payout))
        .route("/payouts", get(get_payouts))
        .route("/payouts/balance", get(get_balance))
}

// POST /api/payouts
#[derive(Debug, Deserialize, Validate)]
struct RequestPayoutBody {
    amount: f64,
    method: String,
    #[validate(email)]
    email: String,
    notes: Option<String>,
    #[serde(default)]
    details: PayoutDetails,
}

async fn request_payout(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Json(req): Json<RequestPayoutBody>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let payout = payout::request_payout(
        &state.db.pool,
        &state.notifier,
        &state.config.payout.momo_prefix,
        user.id,
        PayoutInput {
            amount: req.amount,
            method: req.method,
            email: req.email,
            notes: req.notes,
            details: req.details,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Payout requested", "payout": payout })),
    ))
}

// GET /api/payouts
async fn get_payouts(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
) -> ApiResult<impl IntoResponse> {
    let payouts = sqlx::query_as::<_, PayoutRequest>(
        "SELECT * FROM payout_requests WHERE organizer_id = $1 ORDER BY requested_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(payouts))
}

// GET /api/payouts/balance
//
// Витрина баланса считается тем же кодом, что и проверка при заявке.
async fn get_balance(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
) -> ApiResult<impl IntoResponse> {
    let available = payout::available_balance(&state.db.pool, user.id).await?;
    Ok(Json(json!({ "available": available })))
}
