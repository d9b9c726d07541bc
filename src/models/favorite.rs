use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Favorite {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
