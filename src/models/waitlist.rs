use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Запись листа ожидания. Исторические данные: автоматически не удаляется,
// notified переключается в true ровно один раз.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: i64,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "ticketType")]
    pub tier_name: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notified: bool,
    #[serde(rename = "joinedAt")]
    pub joined_at: DateTime<Utc>,
}
