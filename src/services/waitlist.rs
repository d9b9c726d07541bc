//! waitlist.rs
//!
//! Лист ожидания распроданных тарифов. Дубликаты по (событие, тариф,
//! email) отсекаются уникальным индексом; массовое уведомление
//! идемпотентно по каждой записи. Мест уведомление не резервирует -
//! первый успевший покупатель выигрывает.

use sqlx::PgPool;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::models::{Event, WaitlistEntry};
use crate::services::inventory;
use crate::services::notify::{templates, NotifyGatewayClient};

#[derive(Debug, Clone)]
pub struct WaitlistContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Добавляет контакт в лист ожидания тарифа.
pub async fn join(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    event_id: i64,
    tier_name: &str,
    contact: WaitlistContact,
) -> ApiResult<WaitlistEntry> {
    let event = Event::find_by_id(event_id, pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    let tier = inventory::find_tier(pool, event.id, tier_name)
        .await?
        .ok_or(ApiError::InvalidTier)?;

    let email = contact.email.trim().to_lowercase();

    // Условная вставка: конфликт по уникальному индексу означает, что
    // контакт уже в списке
    let inserted = sqlx::query_as::<_, WaitlistEntry>(
        r#"
        INSERT INTO waitlist_entries (event_id, tier_name, name, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_id, tier_name, email) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(event.id)
    .bind(&tier.name)
    .bind(&contact.name)
    .bind(&email)
    .bind(&contact.phone)
    .fetch_optional(pool)
    .await?;

    let entry = inserted.ok_or(ApiError::AlreadyWaitlisted)?;

    let notifier = notifier.clone();
    let phone = contact.phone.clone();
    let tier_name = tier.name.clone();
    tokio::spawn(async move {
        let sms = templates::waitlist_joined_sms(&tier_name);
        if !notifier.send_sms(&phone, &sms).await {
            warn!("Waitlist confirmation SMS to {} failed", phone);
        }
    });

    Ok(entry)
}

/// Список ожидающих по порядку записи. Только для организатора события.
pub async fn list(
    pool: &PgPool,
    organizer_id: i64,
    event_id: i64,
    tier_name: &str,
) -> ApiResult<Vec<WaitlistEntry>> {
    let event = Event::find_by_id(event_id, pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != organizer_id {
        return Err(ApiError::Unauthorized);
    }

    let entries = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT * FROM waitlist_entries
         WHERE event_id = $1 AND tier_name = $2
         ORDER BY joined_at ASC, id ASC",
    )
    .bind(event.id)
    .bind(tier_name.trim().to_lowercase())
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Рассылает "места снова в продаже" всем еще не уведомленным и
/// переключает notified. Возвращает число уведомленных. Повторный вызов
/// никому не шлет повторно.
pub async fn notify_all(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    organizer_id: i64,
    event_id: i64,
    tier_name: &str,
) -> ApiResult<u64> {
    let event = Event::find_by_id(event_id, pool)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;

    if event.organizer_id != organizer_id {
        return Err(ApiError::Unauthorized);
    }

    let tier_name = tier_name.trim().to_lowercase();
    let pending = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT * FROM waitlist_entries
         WHERE event_id = $1 AND tier_name = $2 AND notified = FALSE
         ORDER BY joined_at ASC, id ASC",
    )
    .bind(event.id)
    .bind(&tier_name)
    .fetch_all(pool)
    .await?;

    let mut notified = 0u64;
    for entry in pending {
        // Отправка best-effort: запись помечается в любом случае,
        // повторных рассылок той же записи не бывает
        let sms = templates::waitlist_available_sms(&tier_name, &event.title);
        if !notifier.send_sms(&entry.phone, &sms).await {
            warn!("Waitlist availability SMS to {} failed", entry.phone);
        }

        sqlx::query("UPDATE waitlist_entries SET notified = TRUE WHERE id = $1")
            .bind(entry.id)
            .execute(pool)
            .await?;

        notified += 1;
    }

    Ok(notified)
}
