//! inventory.rs
//!
//! Учет вместимости тарифов. Резервирование - одно условное UPDATE
//! (инкремент с потолком), поэтому два конкурентных запроса на последние
//! билеты не могут пройти оба.

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{ApiError, ApiResult};
use crate::models::TicketTier;

/// Ищет тариф события по имени (без учета регистра).
pub async fn find_tier(
    pool: &PgPool,
    event_id: i64,
    tier_name: &str,
) -> ApiResult<Option<TicketTier>> {
    let tier = sqlx::query_as::<_, TicketTier>(
        "SELECT * FROM ticket_tiers WHERE event_id = $1 AND name = $2",
    )
    .bind(event_id)
    .bind(tier_name.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(tier)
}

/// Сколько билетов тарифа еще доступно. Только чтение.
pub async fn available_count(pool: &PgPool, event_id: i64, tier_name: &str) -> ApiResult<i32> {
    let available = sqlx::query_scalar::<_, i32>(
        "SELECT capacity - sold FROM ticket_tiers WHERE event_id = $1 AND name = $2",
    )
    .bind(event_id)
    .bind(tier_name.trim().to_lowercase())
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::InvalidTier)?;

    Ok(available)
}

/// Резервирует `quantity` билетов внутри открытой транзакции.
///
/// Инкремент sold и проверка потолка выполняются одним атомарным
/// UPDATE; вставка билетов должна коммититься той же транзакцией,
/// иначе при сбое счетчик разойдется с фактическими билетами.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    event_id: i64,
    tier_name: &str,
    quantity: i32,
) -> ApiResult<()> {
    if quantity <= 0 {
        return Err(ApiError::InsufficientInventory);
    }

    let updated = sqlx::query(
        "UPDATE ticket_tiers
         SET sold = sold + $3
         WHERE event_id = $1 AND name = $2 AND sold + $3 <= capacity",
    )
    .bind(event_id)
    .bind(tier_name.trim().to_lowercase())
    .bind(quantity)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::InsufficientInventory);
    }

    Ok(())
}
