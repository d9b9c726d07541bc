//! payout.rs
//!
//! Выплаты организаторам. Доступный баланс = вся выручка с билетов
//! событий организатора минус уже завершенные выплаты. Создание заявки
//! сериализуется по организатору advisory-блокировкой, чтобы два
//! одновременных запроса не потратили одну и ту же выручку дважды.

use sqlx::PgPool;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::models::payout::{PAYOUT_COMPLETED, PAYOUT_PENDING, PAYOUT_REJECTED};
use crate::models::PayoutRequest;
use crate::services::notify::{templates, NotifyGatewayClient};

pub const METHOD_BANK: &str = "bank";
pub const METHOD_MOMO: &str = "momo";
pub const METHOD_PAYPAL: &str = "paypal";

// Реквизиты, которые приходят вместе с заявкой.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PayoutDetails {
    #[serde(rename = "bankName")]
    pub bank_name: Option<String>,
    #[serde(rename = "accountNumber")]
    pub account_number: Option<String>,
    #[serde(rename = "accountName")]
    pub account_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PayoutInput {
    pub amount: f64,
    pub method: String,
    pub email: String,
    pub notes: Option<String>,
    pub details: PayoutDetails,
}

fn is_momo_phone(phone: &str, prefix: &str) -> bool {
    match phone.strip_prefix(prefix) {
        Some(rest) => rest.len() == 9 && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Полнота реквизитов по методу выплаты. Чистая проверка, без БД.
pub fn validate_method_details(
    method: &str,
    details: &PayoutDetails,
    momo_prefix: &str,
) -> ApiResult<()> {
    let filled = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);

    match method {
        METHOD_BANK => {
            if filled(&details.bank_name)
                && filled(&details.account_number)
                && filled(&details.account_name)
            {
                Ok(())
            } else {
                Err(ApiError::InvalidPayoutDetails(
                    "bank transfers require bank name, account number and account name",
                ))
            }
        }
        METHOD_MOMO => match details.phone.as_deref() {
            Some(phone) if is_momo_phone(phone.trim(), momo_prefix) => Ok(()),
            _ => Err(ApiError::InvalidPayoutDetails(
                "mobile money requires a valid phone number",
            )),
        },
        METHOD_PAYPAL => Ok(()),
        _ => Err(ApiError::Validation("Unsupported payout method".to_string())),
    }
}

/// Доступный баланс организатора. Точечный снимок: без блокировки может
/// устареть к моменту вставки, поэтому request_payout пересчитывает его
/// уже под advisory-локом.
pub async fn available_balance<'e, E>(executor: E, organizer_id: i64) -> ApiResult<f64>
where
    E: sqlx::PgExecutor<'e>,
{
    let balance = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT (
            COALESCE((
                SELECT SUM(t.price)
                FROM tickets t
                JOIN events e ON e.id = t.event_id
                WHERE e.organizer_id = $1
            ), 0)
            -
            COALESCE((
                SELECT SUM(p.amount)
                FROM payout_requests p
                WHERE p.organizer_id = $1 AND p.status = 'completed'
            ), 0)
        )::float8
        "#,
    )
    .bind(organizer_id)
    .fetch_one(executor)
    .await?;

    Ok(balance)
}

/// Создает заявку на выплату в статусе pending.
pub async fn request_payout(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    momo_prefix: &str,
    organizer_id: i64,
    input: PayoutInput,
) -> ApiResult<PayoutRequest> {
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(ApiError::Validation(
            "Payout amount must be greater than zero".to_string(),
        ));
    }

    validate_method_details(&input.method, &input.details, momo_prefix)?;

    let mut tx = pool.begin().await?;

    // Сериализация по организатору: конкурентная заявка того же
    // организатора ждет здесь, пока эта транзакция не закоммитится
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(organizer_id)
        .execute(&mut *tx)
        .await?;

    let available = available_balance(&mut *tx, organizer_id).await?;

    // Под локом учитываются и pending-заявки: одна и та же выручка не
    // может быть запрошена дважды еще до решения администратора
    let pending = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0)::float8
         FROM payout_requests
         WHERE organizer_id = $1 AND status = 'pending'",
    )
    .bind(organizer_id)
    .fetch_one(&mut *tx)
    .await?;

    if input.amount > available - pending {
        return Err(ApiError::InsufficientBalance);
    }

    let payout = sqlx::query_as::<_, PayoutRequest>(
        r#"
        INSERT INTO payout_requests (
            organizer_id, amount, method, status, email, notes,
            bank_name, account_number, account_name, momo_phone
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(organizer_id)
    .bind(input.amount)
    .bind(&input.method)
    .bind(PAYOUT_PENDING)
    .bind(&input.email)
    .bind(&input.notes)
    .bind(&input.details.bank_name)
    .bind(&input.details.account_number)
    .bind(&input.details.account_name)
    .bind(&input.details.phone)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let notifier = notifier.clone();
    let email = payout.email.clone();
    let amount = payout.amount;
    tokio::spawn(async move {
        let (subject, html) = templates::payout_requested_email(amount);
        if !notifier.send_email(&email, &subject, &html).await {
            warn!("Payout confirmation email to {} failed", email);
        }
    });

    Ok(payout)
}

/// Переводит pending-заявку в completed. Повторная финализация
/// невозможна: завершенная заявка не трогается.
pub async fn approve(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    payout_id: i64,
) -> ApiResult<PayoutRequest> {
    let updated = sqlx::query_as::<_, PayoutRequest>(
        "UPDATE payout_requests
         SET status = $2, completed_at = NOW()
         WHERE id = $1 AND status = $3
         RETURNING *",
    )
    .bind(payout_id)
    .bind(PAYOUT_COMPLETED)
    .bind(PAYOUT_PENDING)
    .fetch_optional(pool)
    .await?;

    let payout = match updated {
        Some(p) => p,
        None => return Err(finalization_failure(pool, payout_id).await?),
    };

    let notifier = notifier.clone();
    let email = payout.email.clone();
    let amount = payout.amount;
    tokio::spawn(async move {
        let (subject, html) = templates::payout_approved_email(amount);
        if !notifier.send_email(&email, &subject, &html).await {
            warn!("Payout approval email to {} failed", email);
        }
    });

    Ok(payout)
}

/// Переводит pending-заявку в rejected с указанием причины.
pub async fn reject(
    pool: &PgPool,
    notifier: &NotifyGatewayClient,
    payout_id: i64,
    reason: &str,
) -> ApiResult<PayoutRequest> {
    let updated = sqlx::query_as::<_, PayoutRequest>(
        "UPDATE payout_requests
         SET status = $2, rejection_reason = $3
         WHERE id = $1 AND status = $4
         RETURNING *",
    )
    .bind(payout_id)
    .bind(PAYOUT_REJECTED)
    .bind(reason)
    .bind(PAYOUT_PENDING)
    .fetch_optional(pool)
    .await?;

    let payout = match updated {
        Some(p) => p,
        None => return Err(finalization_failure(pool, payout_id).await?),
    };

    let notifier = notifier.clone();
    let email = payout.email.clone();
    let reason = reason.to_string();
    tokio::spawn(async move {
        let (subject, html) = templates::payout_rejected_email(&reason);
        if !notifier.send_email(&email, &subject, &html).await {
            warn!("Payout rejection email to {} failed", email);
        }
    });

    Ok(payout)
}

// Разбирает, почему условный UPDATE ничего не обновил: заявки нет
// вообще или она уже финализирована.
async fn finalization_failure(pool: &PgPool, payout_id: i64) -> Result<ApiError, sqlx::Error> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM payout_requests WHERE id = $1)",
    )
    .bind(payout_id)
    .fetch_one(pool)
    .await?;

    if exists {
        Ok(ApiError::AlreadyFinalized)
    } else {
        Ok(ApiError::NotFound("Payout request"))
    }
}
