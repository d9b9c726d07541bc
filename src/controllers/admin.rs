//! admin.rs
//!
//! Модерация площадки: пользователи, события, выплаты и сводная
//! статистика. Все ручки доступны только администраторам.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Admin;
use crate::models::{Event, PayoutRequest, User};
use crate::services::payout;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(get_all_users))
        .route("/users/{id}/suspend", patch(suspend_user))
        .route("/users/{id}", delete(delete_user))
        .route("/events", get(get_all_events))
        .route("/events/{id}/flag", patch(flag_event))
        .route("/payouts", get(get_all_payouts))
        .route("/payouts/{id}/approve", patch(approve_payout))
        .route("/payouts/{id}/reject", patch(reject_payout))
        .route("/stats", get(get_stats))
}

/* ---------- пользователи ---------- */

#[derive(Debug, Deserialize)]
struct AdminSearchQuery {
    search: Option<String>,
    filter: Option<String>,
}

// GET /api/admin/users
async fn get_all_users(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Query(params): Query<AdminSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut q = String::from("SELECT * FROM users WHERE TRUE");

    if params.search.is_some() {
        q.push_str(" AND (name ILIKE $1 OR email ILIKE $1)");
    }
    match params.filter.as_deref() {
        Some("organizers") => q.push_str(" AND is_organizer = TRUE"),
        Some("suspended") => q.push_str(" AND suspended = TRUE"),
        _ => {}
    }
    q.push_str(" ORDER BY created_at DESC");

    let mut dbq = sqlx::query_as::<_, User>(&q);
    if let Some(s) = &params.search {
        dbq = dbq.bind(format!("%{}%", s));
    }

    let users = dbq.fetch_all(&state.db.pool).await?;
    Ok(Json(users))
}

// PATCH /api/admin/users/{id}/suspend
async fn suspend_user(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET suspended = NOT suspended WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    let message = if user.suspended {
        "User suspended"
    } else {
        "User activated"
    };
    Ok(Json(json!({ "message": message, "user": user })))
}

// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    // Каскад уносит события пользователя вместе с их билетами и
    // листами ожидания, а также его собственные билеты и избранное
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("User"));
    }

    state.cache.invalidate_events().await;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/* ---------- события ---------- */

// GET /api/admin/events
async fn get_all_events(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Query(params): Query<AdminSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut q = String::from("SELECT * FROM events WHERE TRUE");

    if params.search.is_some() {
        q.push_str(" AND (title ILIKE $1 OR venue ILIKE $1)");
    }
    match params.filter.as_deref() {
        Some("live") => {
            q.push_str(" AND is_published = TRUE AND is_cancelled = FALSE AND date > NOW()")
        }
        Some("cancelled") => q.push_str(" AND is_cancelled = TRUE"),
        Some("flagged") => q.push_str(" AND flagged = TRUE"),
        _ => {}
    }
    q.push_str(" ORDER BY created_at DESC");

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(s) = &params.search {
        dbq = dbq.bind(format!("%{}%", s));
    }

    let events = dbq.fetch_all(&state.db.pool).await?;
    Ok(Json(events))
}

// PATCH /api/admin/events/{id}/flag
async fn flag_event(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET flagged = NOT flagged WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("Event"))?;

    let message = if event.flagged {
        "Event flagged"
    } else {
        "Event unflagged"
    };
    Ok(Json(json!({ "message": message, "event": event })))
}

/* ---------- выплаты ---------- */

#[derive(Debug, Serialize, FromRow)]
struct AdminPayoutRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    payout: PayoutRequest,
    #[serde(rename = "organizerName")]
    organizer_name: String,
    #[serde(rename = "organizerEmail")]
    organizer_email: String,
}

// GET /api/admin/payouts
async fn get_all_payouts(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<impl IntoResponse> {
    let payouts = sqlx::query_as::<_, AdminPayoutRow>(
        r#"
        SELECT p.*, u.name AS organizer_name, u.email AS organizer_email
        FROM payout_requests p
        JOIN users u ON u.id = p.organizer_id
        ORDER BY p.requested_at DESC
        "#,
    )
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(payouts))
}

// PATCH /api/admin/payouts/{id}/approve
async fn approve_payout(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let payout = payout::approve(&state.db.pool, &state.notifier, id).await?;
    Ok(Json(json!({ "message": "Payout approved", "payout": payout })))
}

// PATCH /api/admin/payouts/{id}/reject
#[derive(Debug, Deserialize)]
struct RejectPayoutRequest {
    reason: String,
}

async fn reject_payout(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
    Json(req): Json<RejectPayoutRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.reason.trim().is_empty() {
        return Err(ApiError::Validation(
            "Rejection reason is required".to_string(),
        ));
    }

    let payout = payout::reject(&state.db.pool, &state.notifier, id, req.reason.trim()).await?;
    Ok(Json(json!({ "message": "Payout rejected", "payout": payout })))
}

/* ---------- статистика ---------- */

// GET /api/admin/stats
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<impl IntoResponse> {
    let pool = &state.db.pool;

    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let total_organizers =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_organizer = TRUE")
            .fetch_one(pool)
            .await?;
    let total_events = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;
    let live_events = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM events
         WHERE is_published = TRUE AND is_cancelled = FALSE AND date > NOW()",
    )
    .fetch_one(pool)
    .await?;
    let total_tickets = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets")
        .fetch_one(pool)
        .await?;
    let total_revenue =
        sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(price), 0)::float8 FROM tickets")
            .fetch_one(pool)
            .await?;
    let pending_payout_amount = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0)::float8 FROM payout_requests WHERE status = 'pending'",
    )
    .fetch_one(pool)
    .await?;
    let flagged_events =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE flagged = TRUE")
            .fetch_one(pool)
            .await?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalOrganizers": total_organizers,
        "totalEvents": total_events,
        "liveEvents": live_events,
        "totalTickets": total_tickets,
        "totalRevenue": total_revenue,
        "pendingPayoutAmount": pending_payout_amount,
        "flaggedEvents": flagged_events,
        "platformFee": total_revenue * state.config.payout.platform_fee_percent / 100.0,
    })))
}
