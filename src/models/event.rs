use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub location: String,
    pub category: String,
    pub currency: String,
    #[serde(rename = "organizerId")]
    pub organizer_id: i64,
    #[serde(rename = "isPublished")]
    pub is_published: bool,
    #[serde(rename = "isCancelled")]
    pub is_cancelled: bool,
    pub flagged: bool,
    #[serde(rename = "shareCount")]
    pub share_count: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub async fn find_by_id(id: i64, pool: &sqlx::PgPool) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

// Тариф билета внутри события. Счетчик sold двигает только покупка.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TicketTier {
    pub id: i64,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    pub name: String,
    pub price: f64,
    pub capacity: i32,
    pub sold: i32,
    #[serde(rename = "earlyBirdPrice")]
    pub early_bird_price: Option<f64>,
    #[serde(rename = "earlyBirdEnd")]
    pub early_bird_end: Option<DateTime<Utc>>,
    #[serde(rename = "groupDiscountPercent")]
    pub group_discount_percent: f64,
}

// Тариф в том виде, в котором его присылает организатор при
// создании/редактировании события.
#[derive(Debug, Clone, Deserialize)]
pub struct TierSpec {
    pub price: f64,
    pub capacity: i32,
    #[serde(rename = "earlyBirdPrice")]
    pub early_bird_price: Option<f64>,
    #[serde(rename = "earlyBirdEnd")]
    pub early_bird_end: Option<DateTime<Utc>>,
    #[serde(rename = "groupDiscountPercent", default = "default_group_discount")]
    pub group_discount_percent: f64,
}

fn default_group_discount() -> f64 {
    10.0
}
