use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Один билет = одна строка. Покупка N билетов создает N строк с
// одинаковой ценой за единицу; цена фиксируется на момент покупки.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    #[serde(rename = "ticketId")]
    pub ticket_id: String,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "userPhone")]
    pub user_phone: String,
    #[serde(rename = "ticketType")]
    pub tier_name: String,
    pub price: f64,
    pub quantity: i32,
    #[serde(rename = "companyName")]
    pub company_name: Option<String>,
    #[serde(rename = "billingAddress")]
    pub billing_address: Option<String>,
    #[serde(rename = "poNumber")]
    pub po_number: Option<String>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: String,
    #[serde(rename = "paymentStatus")]
    pub payment_status: String,
    pub validated: bool,
    #[serde(rename = "validatedAt")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(rename = "purchasedAt")]
    pub purchased_at: DateTime<Utc>,
}
