use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, Organizer};
use crate::models::{Event, Ticket};
use crate::services::purchase::{self, Buyer, PurchaseOrder};
use crate::services::{inventory, pricing};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/purchase", post(purchase_tickets))
        .route("/tickets/quote", get(quote))
        .route("/tickets/my-tickets", get(my_tickets))
        .route("/tickets/{ticket_id}/validate", post(validate_ticket))
}

/* ---------- покупка ---------- */

// POST /api/tickets/purchase
#[derive(Debug, Deserialize)]
struct PurchaseTicketRequest {
    #[serde(rename = "eventId")]
    event_id: i64,
    #[serde(rename = "ticketType")]
    ticket_type: String,
    quantity: i32,
    #[serde(rename = "paymentMethod")]
    payment_method: String,
    #[serde(rename = "companyName")]
    company_name: Option<String>,
    #[serde(rename = "billingAddress")]
    billing_address: Option<String>,
    #[serde(rename = "poNumber")]
    po_number: Option<String>,
}

async fn purchase_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<PurchaseTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = purchase::purchase(
        &state.db.pool,
        &state.notifier,
        Buyer {
            user_id: user.id,
            email: user.email,
            phone: user.phone,
        },
        PurchaseOrder {
            event_id: req.event_id,
            tier_name: req.ticket_type,
            quantity: req.quantity,
            payment_method: req.payment_method,
            company_name: req.company_name,
            billing_address: req.billing_address,
            po_number: req.po_number,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Tickets purchased successfully",
            "tickets": outcome.tickets,
            "total": outcome.total,
        })),
    ))
}

/* ---------- оценка стоимости ---------- */

// GET /api/tickets/quote
//
// Витринная оценка цены. Считается тем же кодом, что и покупка:
// никакого дублирования прайсинга на клиенте.
#[derive(Debug, Deserialize)]
struct QuoteQuery {
    #[serde(rename = "eventId")]
    event_id: i64,
    #[serde(rename = "ticketType")]
    ticket_type: String,
    quantity: Option<i32>,
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuoteQuery>,
) -> ApiResult<impl IntoResponse> {
    let quantity = params.quantity.unwrap_or(1).max(1);

    let event = Event::find_by_id(params.event_id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    let tier = inventory::find_tier(&state.db.pool, event.id, &params.ticket_type)
        .await?
        .ok_or(ApiError::InvalidTier)?;

    let unit_price = pricing::effective_price(&tier, quantity, Utc::now())?;
    let available = inventory::available_count(&state.db.pool, event.id, &tier.name).await?;

    Ok(Json(json!({
        "ticketType": tier.name,
        "quantity": quantity,
        "unitPrice": unit_price,
        "total": unit_price * quantity as f64,
        "available": available,
        "currency": event.currency,
    })))
}

/* ---------- мои билеты ---------- */

#[derive(Debug, Serialize, FromRow)]
struct TicketWithEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    ticket: Ticket,
    #[serde(rename = "eventTitle")]
    event_title: String,
    #[serde(rename = "eventDate")]
    event_date: DateTime<Utc>,
}

// GET /api/tickets/my-tickets
async fn my_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let tickets = sqlx::query_as::<_, TicketWithEvent>(
        r#"
        SELECT t.*, e.title AS event_title, e.date AS event_date
        FROM tickets t
        JOIN events e ON e.id = t.event_id
        WHERE t.user_id = $1
        ORDER BY t.purchased_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(tickets))
}

/* ---------- чекин ---------- */

// POST /api/tickets/{ticket_id}/validate
async fn validate_ticket(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path(ticket_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE ticket_id = $1")
        .bind(&ticket_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Ticket"))?;

    let event = Event::find_by_id(ticket.event_id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != user.id {
        return Err(ApiError::Unauthorized);
    }

    // Условный UPDATE: флаг ставится ровно один раз даже при гонке
    // двух сканирований одного билета
    let validated = sqlx::query_as::<_, Ticket>(
        "UPDATE tickets
         SET validated = TRUE, validated_at = NOW()
         WHERE ticket_id = $1 AND validated = FALSE
         RETURNING *",
    )
    .bind(&ticket_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::AlreadyValidated)?;

    Ok(Json(json!({
        "message": "Ticket validated successfully",
        "ticket": validated,
    })))
}
