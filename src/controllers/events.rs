use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Organizer;
use crate::models::event::TierSpec;
use crate::models::{Event, TicketTier};
use crate::services::notify::templates;
use crate::services::pricing;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events", post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}", put(update_event))
        .route("/events/{id}", delete(delete_event))
        .route("/events/{id}/cancel", post(cancel_event))
        .route("/events/{id}/share", post(share_event))
}

/* ---------- представление события ---------- */

#[derive(Debug, Serialize)]
pub struct TierView {
    pub price: f64,
    pub capacity: i32,
    pub sold: i32,
    // Свободный остаток по данным учета, не пересчитывается на клиенте
    pub available: i32,
    #[serde(rename = "earlyBirdPrice")]
    pub early_bird_price: Option<f64>,
    #[serde(rename = "earlyBirdEnd")]
    pub early_bird_end: Option<DateTime<Utc>>,
    #[serde(rename = "groupDiscountPercent")]
    pub group_discount_percent: f64,
}

impl From<&TicketTier> for TierView {
    fn from(t: &TicketTier) -> Self {
        TierView {
            price: t.price,
            capacity: t.capacity,
            sold: t.sold,
            available: t.capacity - t.sold,
            early_bird_price: t.early_bird_price,
            early_bird_end: t.early_bird_end,
            group_discount_percent: t.group_discount_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    #[serde(rename = "ticketTypes")]
    pub ticket_types: HashMap<String, TierView>,
}

async fn load_tiers(
    pool: &sqlx::PgPool,
    event_ids: Vec<i64>,
) -> Result<HashMap<i64, Vec<TicketTier>>, sqlx::Error> {
    let tiers = sqlx::query_as::<_, TicketTier>(
        "SELECT * FROM ticket_tiers WHERE event_id = ANY($1) ORDER BY name",
    )
    .bind(event_ids)
    .fetch_all(pool)
    .await?;

    let mut by_event: HashMap<i64, Vec<TicketTier>> = HashMap::new();
    for tier in tiers {
        by_event.entry(tier.event_id).or_default().push(tier);
    }
    Ok(by_event)
}

fn to_detail(event: Event, tiers: &[TicketTier]) -> EventDetail {
    let ticket_types = tiers
        .iter()
        .map(|t| (t.name.clone(), TierView::from(t)))
        .collect();
    EventDetail {
        event,
        ticket_types,
    }
}

/* ---------- публичные ручки ---------- */

// GET /api/events
#[derive(Debug, Deserialize)]
struct EventsQuery {
    category: Option<String>,
    location: Option<String>,
    search: Option<String>,
    status: Option<String>, // upcoming
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> ApiResult<Response> {
    // Кешируется только витрина без фильтров
    let unfiltered = params.category.is_none()
        && params.location.is_none()
        && params.search.is_none()
        && params.status.is_none();

    if unfiltered {
        if let Some(cached) = state.cache.get_cached_events().await {
            return Ok(Response::builder()
                .header("Content-Type", "application/json")
                .header("X-Cache", "HIT")
                .body(Body::from(cached))
                .unwrap());
        }
    }

    // Публичный список: только опубликованные и не отмененные
    let mut q = String::from("SELECT * FROM events WHERE is_cancelled = FALSE AND is_published = TRUE");
    let mut bind_idx = 1;

    if params.category.is_some() {
        q.push_str(&format!(" AND category = ${}", bind_idx));
        bind_idx += 1;
    }
    if params.location.is_some() {
        q.push_str(&format!(" AND location = ${}", bind_idx));
        bind_idx += 1;
    }
    if params.search.is_some() {
        q.push_str(&format!(
            " AND (title ILIKE ${} OR description ILIKE ${})",
            bind_idx, bind_idx
        ));
        bind_idx += 1;
    }
    if params.status.as_deref() == Some("upcoming") {
        q.push_str(" AND date > NOW()");
    }
    let _ = bind_idx;
    q.push_str(" ORDER BY date ASC");

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(c) = &params.category {
        dbq = dbq.bind(c.clone());
    }
    if let Some(l) = &params.location {
        dbq = dbq.bind(l.clone());
    }
    if let Some(s) = &params.search {
        dbq = dbq.bind(format!("%{}%", s));
    }

    let events = dbq.fetch_all(&state.db.pool).await?;

    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    let mut tiers_by_event = load_tiers(&state.db.pool, ids).await?;

    let details: Vec<EventDetail> = events
        .into_iter()
        .map(|e| {
            let tiers = tiers_by_event.remove(&e.id).unwrap_or_default();
            to_detail(e, &tiers)
        })
        .collect();

    if unfiltered {
        if let Ok(json_str) = serde_json::to_string(&details) {
            state.cache.cache_events(&json_str).await;
            return Ok(Response::builder()
                .header("Content-Type", "application/json")
                .header("X-Cache", "MISS")
                .body(Body::from(json_str))
                .unwrap());
        }
    }

    Ok(Json(details).into_response())
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = Event::find_by_id(id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    let tiers_by_event = load_tiers(&state.db.pool, vec![event.id]).await?;
    let tiers = tiers_by_event.get(&event.id).cloned().unwrap_or_default();

    Ok(Json(to_detail(event, &tiers)))
}

/* ---------- ручки организатора ---------- */

// POST /api/events
#[derive(Debug, Deserialize, Validate)]
struct CreateEventRequest {
    #[validate(length(min = 1, message = "title is required"))]
    title: String,
    #[validate(length(min = 1, message = "description is required"))]
    description: String,
    date: DateTime<Utc>,
    #[validate(length(min = 1, message = "venue is required"))]
    venue: String,
    #[validate(length(min = 1, message = "location is required"))]
    location: String,
    #[validate(length(min = 1, message = "category is required"))]
    category: String,
    currency: Option<String>,
    #[serde(rename = "ticketTypes")]
    ticket_types: HashMap<String, TierSpec>,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    // Тарифы валидируются до записи: цены, вместимость, лимит скидки
    let tiers = pricing::validate_tier_specs(&req.ticket_types)?;

    let mut tx = state.db.pool.begin().await?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (title, description, date, venue, location, category, currency, organizer_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.date)
    .bind(req.venue.trim())
    .bind(req.location.trim())
    .bind(req.category.trim())
    .bind(req.currency.as_deref().unwrap_or("GHC"))
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    for (name, spec) in &tiers {
        sqlx::query(
            r#"
            INSERT INTO ticket_tiers (event_id, name, price, capacity, early_bird_price, early_bird_end, group_discount_percent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(name)
        .bind(spec.price)
        .bind(spec.capacity)
        .bind(spec.early_bird_price)
        .bind(spec.early_bird_end)
        .bind(spec.group_discount_percent)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    state.cache.invalidate_events().await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event created successfully", "event": event })),
    ))
}

// PUT /api/events/{id}
#[derive(Debug, Deserialize)]
struct UpdateEventRequest {
    title: Option<String>,
    description: Option<String>,
    date: Option<DateTime<Utc>>,
    venue: Option<String>,
    location: Option<String>,
    category: Option<String>,
    currency: Option<String>,
    #[serde(rename = "isPublished")]
    is_published: Option<bool>,
    #[serde(rename = "ticketTypes")]
    ticket_types: Option<HashMap<String, TierSpec>>,
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let event = Event::find_by_id(id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != user.id {
        return Err(ApiError::Unauthorized);
    }

    let tiers = match &req.ticket_types {
        Some(specs) => Some(pricing::validate_tier_specs(specs)?),
        None => None,
    };

    let mut tx = state.db.pool.begin().await?;

    let updated = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            date = COALESCE($4, date),
            venue = COALESCE($5, venue),
            location = COALESCE($6, location),
            category = COALESCE($7, category),
            currency = COALESCE($8, currency),
            is_published = COALESCE($9, is_published)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event.id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.date)
    .bind(&req.venue)
    .bind(&req.location)
    .bind(&req.category)
    .bind(&req.currency)
    .bind(req.is_published)
    .fetch_one(&mut *tx)
    .await?;

    // Тарифы обновляются с сохранением sold: счетчик продаж принадлежит
    // покупкам, редактирование не может его сбросить
    if let Some(tiers) = tiers {
        for (name, spec) in &tiers {
            let existing = sqlx::query_as::<_, TicketTier>(
                "SELECT * FROM ticket_tiers WHERE event_id = $1 AND name = $2",
            )
            .bind(event.id)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(tier) => {
                    if spec.capacity < tier.sold {
                        return Err(ApiError::Validation(format!(
                            "Capacity for ticket type '{}' cannot drop below {} already sold",
                            name, tier.sold
                        )));
                    }
                    sqlx::query(
                        r#"
                        UPDATE ticket_tiers
                        SET price = $3, capacity = $4, early_bird_price = $5,
                            early_bird_end = $6, group_discount_percent = $7
                        WHERE event_id = $1 AND name = $2
                        "#,
                    )
                    .bind(event.id)
                    .bind(name)
                    .bind(spec.price)
                    .bind(spec.capacity)
                    .bind(spec.early_bird_price)
                    .bind(spec.early_bird_end)
                    .bind(spec.group_discount_percent)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO ticket_tiers (event_id, name, price, capacity, early_bird_price, early_bird_end, group_discount_percent)
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(event.id)
                    .bind(name)
                    .bind(spec.price)
                    .bind(spec.capacity)
                    .bind(spec.early_bird_price)
                    .bind(spec.early_bird_end)
                    .bind(spec.group_discount_percent)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
    }

    tx.commit().await?;

    state.cache.invalidate_events().await;

    Ok(Json(json!({ "message": "Event updated", "event": updated })))
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = Event::find_by_id(id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != user.id {
        return Err(ApiError::Unauthorized);
    }

    // Каскад удаляет тарифы, билеты и лист ожидания
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event.id)
        .execute(&state.db.pool)
        .await?;

    state.cache.invalidate_events().await;

    Ok(Json(json!({ "message": "Event deleted successfully" })))
}

// POST /api/events/{id}/cancel
async fn cancel_event(
    State(state): State<Arc<AppState>>,
    Organizer(user): Organizer,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = Event::find_by_id(id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != user.id {
        return Err(ApiError::Unauthorized);
    }

    sqlx::query("UPDATE events SET is_cancelled = TRUE WHERE id = $1")
        .bind(event.id)
        .execute(&state.db.pool)
        .await?;

    // Каждому покупателю по одному письму и SMS, без дублей на билет
    let buyers: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT user_email, user_phone FROM tickets WHERE event_id = $1",
    )
    .bind(event.id)
    .fetch_all(&state.db.pool)
    .await?;

    let notifier = state.notifier.clone();
    let title = event.title.clone();
    tokio::spawn(async move {
        for (email, phone) in buyers {
            let (subject, html) = templates::event_cancelled_email(&title);
            if !notifier.send_email(&email, &subject, &html).await {
                warn!("Cancellation email to {} failed", email);
            }
            let sms = templates::event_cancelled_sms(&title);
            if !notifier.send_sms(&phone, &sms).await {
                warn!("Cancellation SMS to {} failed", phone);
            }
        }
    });

    state.cache.invalidate_events().await;

    Ok(Json(json!({ "message": "Event cancelled and notifications sent" })))
}

// POST /api/events/{id}/share
async fn share_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let updated = sqlx::query("UPDATE events SET share_count = share_count + 1 WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(ApiError::NotFound("Event"));
    }

    Ok(Json(json!({ "message": "Share tracked" })))
}
