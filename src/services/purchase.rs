//! purchase.rs
//!
//! Оркестровка покупки билетов: событие -> тариф -> резерв -> цена ->
//! N билетов одной транзакцией -> уведомления после коммита.
//!
//! Частичных состояний снаружи не видно: инкремент sold и вставка
//! билетов коммитятся вместе, уведомления летят только после коммита и
//! на результат покупки не влияют.

use chrono::Utc;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Ticket;
use crate::services::notify::{templates, NotifyGatewayClient};
use crate::services::{inventory, pricing};

// От этого количества покупка считается корпоративной/групповой.
const CORPORATE_THRESHOLD: i32 = 5;

#[derive(Debug, Clone)]
pub struct Buyer {
    pub user_id: i64,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub event_id: i64,
    pub tier_name: String,
    pub quantity: i32,
    pub payment_method: String,
    pub company_name: Option<String>,
    pub billing_address: Option<String>,
    pub po_number: Option<String>,
}

#[derive(Debug)]
pub struct PurchaseOutcome {
    pub tickets: Vec<Ticket>,
    pub total: f64,
}

/// Уникальный идентификатор билета: GLY-<millis>-<6 hex>.
/// Коллизия ловится уникальным индексом и прерывает покупку.
pub fn generate_ticket_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!(
        "GLY-{}-{}",
        Utc::now().timestamp_millis(),
        uuid[..6].to_uppercase()
    )
}

/// Групповая покупка от имени компании требует платежный адрес.
/// Проверяется до резервирования, чтобы не трогать счетчики зря.
fn validate_corporate_fields(order: &PurchaseOrder) -> ApiResult<()> {
    let has_company = order
        .company_name
        .as_deref()
        .map(|c| !c.trim().is_empty())
        .unwrap_or(false);
    let has_billing = order
        .billing_address
        .as_deref()
        .map(|b| !b.trim().is_empty())
        .unwrap_or(false);

    if order.quantity >= CORPORATE_THRESHOLD && has_company && !has_billing {
        return Err(ApiError::MissingBillingAddress);
    }

    Ok(())
}

fn is_ticket_id_conflict(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some("tickets_ticket_id_key")
    )
}

pub async fn purchase(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    buyer: Buyer,
    order: PurchaseOrder,
) -> ApiResult<PurchaseOutcome> {
    let event = crate::models::Event::find_by_id(order.event_id, pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.is_cancelled {
        return Err(ApiError::EventUnavailable);
    }

    let tier = inventory::find_tier(pool, event.id, &order.tier_name)
        .await?
        .ok_or(ApiError::InvalidTier)?;

    validate_corporate_fields(&order)?;

    // Цена фиксируется на момент покупки и не пересчитывается
    let unit_price = pricing::effective_price(&tier, order.quantity, Utc::now())?;

    let mut tx = pool.begin().await?;

    inventory::reserve(&mut tx, event.id, &tier.name, order.quantity).await?;

    let mut tickets = Vec::with_capacity(order.quantity as usize);
    for _ in 0..order.quantity {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                ticket_id, event_id, user_id, user_email, user_phone,
                tier_name, price, quantity, company_name, billing_address,
                po_number, payment_method
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(generate_ticket_id())
        .bind(event.id)
        .bind(buyer.user_id)
        .bind(&buyer.email)
        .bind(&buyer.phone)
        .bind(&tier.name)
        .bind(unit_price)
        .bind(&order.company_name)
        .bind(&order.billing_address)
        .bind(&order.po_number)
        .bind(&order.payment_method)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_ticket_id_conflict(&e) {
                ApiError::TicketIdCollision
            } else {
                ApiError::Database(e)
            }
        })?;

        tickets.push(ticket);
    }

    tx.commit().await?;

    let total = unit_price * order.quantity as f64;

    // Уведомления после коммита, fire-and-forget
    let notifier = notifier.clone();
    let quantity = order.quantity;
    let tier_name = tier.name.clone();
    let event_title = event.title.clone();
    let currency = event.currency.clone();
    let email = buyer.email.clone();
    let phone = buyer.phone.clone();
    tokio::spawn(async move {
        let (subject, html) =
            templates::purchase_email(&event_title, quantity, &tier_name, &currency, total);
        if !notifier.send_email(&email, &subject, &html).await {
            warn!("Purchase confirmation email to {} failed", email);
        }
        let sms = templates::purchase_sms(quantity, &event_title, &tier_name);
        if !notifier.send_sms(&phone, &sms).await {
            warn!("Purchase confirmation SMS to {} failed", phone);
        }
    });

    Ok(PurchaseOutcome { tickets, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(quantity: i32, company: Option<&str>, billing: Option<&str>) -> PurchaseOrder {
        PurchaseOrder {
            event_id: 1,
            tier_name: "regular".to_string(),
            quantity,
            payment_method: "momo".to_string(),
            company_name: company.map(str::to_string),
            billing_address: billing.map(str::to_string),
            po_number: None,
        }
    }

    #[test]
    fn ticket_id_format() {
        let id = generate_ticket_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "GLY");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn corporate_purchase_requires_billing_address() {
        assert!(matches!(
            validate_corporate_fields(&order(5, Some("Acme Ltd"), None)),
            Err(ApiError::MissingBillingAddress)
        ));
        assert!(matches!(
            validate_corporate_fields(&order(5, Some("Acme Ltd"), Some("  "))),
            Err(ApiError::MissingBillingAddress)
        ));

        // Меньше порога или без компании - не корпоративная покупка
        assert!(validate_corporate_fields(&order(4, Some("Acme Ltd"), None)).is_ok());
        assert!(validate_corporate_fields(&order(10, None, None)).is_ok());
        assert!(
            validate_corporate_fields(&order(5, Some("Acme Ltd"), Some("1 Oxford St"))).is_ok()
        );
    }
}
