use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Статусы completed и rejected терминальные.
pub const PAYOUT_PENDING: &str = "pending";
pub const PAYOUT_COMPLETED: &str = "completed";
pub const PAYOUT_REJECTED: &str = "rejected";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: i64,
    #[serde(rename = "organizerId")]
    pub organizer_id: i64,
    pub amount: f64,
    pub method: String,
    pub status: String,
    pub email: String,
    pub notes: Option<String>,
    #[serde(rename = "bankName")]
    pub bank_name: Option<String>,
    #[serde(rename = "accountNumber")]
    pub account_number: Option<String>,
    #[serde(rename = "accountName")]
    pub account_name: Option<String>,
    #[serde(rename = "momoPhone")]
    pub momo_phone: Option<String>,
    #[serde(rename = "rejectionReason")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "requestedAt")]
    pub requested_at: DateTime<Utc>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
}
