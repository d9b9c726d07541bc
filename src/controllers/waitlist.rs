use axum::{
    extract::{Path, State},
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
use crate::services::waitlist::{self, WaitlistContact};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/waitlist", post(join_waitlist))
        .route("/waitlist/{event_id}/{ticket_type}", get(get_waitlist))
        .route("/waitlist/notify/{event_id}/{ticket_type}", post(notify_waitlist))
}

// POST /api/waitlist
//
// Открытая ручка: в лист ожидания можно встать без аккаунта.
#[derive(Debug, Deserialize, Validate)]
struct JoinWaitlistRequest {
    #[serde(rename = "eventId")]
    event_id: i64,
    #[serde(rename = "ticketType")]
    ticket_type: String,
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    phone: String,
}

async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinWaitlistRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let entry = waitlist::join(
        &state.db.pool,
        &state.notifier,
        req.event_id,
        &req.ticket_type,
        WaitlistContact {
            name: req.name,
            email: req.email,
            phone: req.phone,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Added to waitlist", "entry": entry })),
    ))
}

// GET /api/waitlist/{event_id}/{ticket_type}
async fn get_waitlist(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path((event_id, ticket_type)): Path<(i64, String)>,
) -> ApiResult<impl IntoResponse> {
    let entries = waitlist::list(&state.db.pool, user.id, event_id, &ticket_type).await?;
    Ok(Json(entries))
}

// POST /api/waitlist/notify/{event_id}/{ticket_type}
async fn notify_waitlist(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path((event_id, ticket_type)): Path<(i64, String)>,
) -> ApiResult<impl IntoResponse> {
    let notified = waitlist::notify_all(
        &state.db.pool,
        &state.notifier,
        user.id,
        event_id,
        &ticket_type,
    )
    .await?;

    Ok(Json(json!({
        "message": format!("Notified {} people on waitlist", notified),
        "notified": notified,
    })))
}
