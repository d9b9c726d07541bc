use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::Event;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/favorites/toggle", post(toggle_favorite))
        .route("/favorites", get(get_favorites))
}

// POST /api/favorites/toggle
#[derive(Debug, Deserialize)]
struct ToggleFavoriteRequest {
    #[serde(rename = "eventId")]
    event_id: i64,
}

async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ToggleFavoriteRequest>,
) -> ApiResult<impl IntoResponse> {
    let event = Event::find_by_id(req.event_id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND event_id = $2")
        .bind(user.id)
        .bind(event.id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(Json(
            json!({ "message": "Removed from favorites", "isFavorite": false }),
        ));
    }

    sqlx::query(
        "INSERT INTO favorites (user_id, event_id) VALUES ($1, $2)
         ON CONFLICT (user_id, event_id) DO NOTHING",
    )
    .bind(user.id)
    .bind(event.id)
    .execute(&state.db.pool)
    .await?;

    Ok(Json(
        json!({ "message": "Added to favorites", "isFavorite": true }),
    ))
}

// GET /api/favorites
async fn get_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT e.*
        FROM favorites f
        JOIN events e ON e.id = f.event_id
        WHERE f.user_id = $1 AND e.is_cancelled = FALSE
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(events))
}
