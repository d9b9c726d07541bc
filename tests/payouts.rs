mod common;

use common::{seed_event, seed_ticket, seed_user, test_notifier};
use glycr_api::error::ApiError;
use glycr_api::services::payout::{
    approve, available_balance, reject, request_payout, PayoutDetails, PayoutInput,
};
use sqlx::PgPool;

const MOMO_PREFIX: &str = "+233";

fn momo_input(amount: f64) -> PayoutInput {
    PayoutInput {
        amount,
        method: "momo".to_string(),
        email: "org@example.com".to_string(),
        notes: None,
        details: PayoutDetails {
            phone: Some("+233201234567".to_string()),
            ..Default::default()
        },
    }
}

// Организатор с выручкой 500 и завершенной выплатой 200
async fn organizer_with_balance_300(pool: &PgPool) -> i64 {
    let organizer = seed_user(pool, "org@example.com", true).await;
    let buyer = seed_user(pool, "buyer@example.com", false).await;
    let event = seed_event(pool, organizer).await;

    seed_ticket(pool, event, buyer, 250.0).await;
    seed_ticket(pool, event, buyer, 250.0).await;

    sqlx::query(
        "INSERT INTO payout_requests (organizer_id, amount, method, status, email, momo_phone, completed_at)
         VALUES ($1, 200, 'momo', 'completed', 'org@example.com', '+233201234567', NOW())",
    )
    .bind(organizer)
    .execute(pool)
    .await
    .unwrap();

    organizer
}

#[sqlx::test(migrations = "./src/migrations")]
async fn balance_is_revenue_minus_completed_payouts(pool: PgPool) {
    let organizer = organizer_with_balance_300(&pool).await;

    let available = available_balance(&pool, organizer).await.unwrap();
    assert_eq!(available, 300.0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn request_above_balance_fails_at_balance_succeeds(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    let err = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(301.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientBalance));

    let payout = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(300.0))
        .await
        .expect("exact balance is allowed");
    assert_eq!(payout.status, "pending");
    assert_eq!(payout.amount, 300.0);
    assert!(payout.completed_at.is_none());
}

#[sqlx::test(migrations = "./src/migrations")]
async fn pending_requests_reserve_balance_for_new_requests(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(250.0))
        .await
        .unwrap();

    // Отображаемый баланс учитывает только завершенные выплаты...
    assert_eq!(available_balance(&pool, organizer).await.unwrap(), 300.0);

    // ...но новая заявка не может претендовать на уже запрошенное
    let err = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientBalance));

    request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(50.0))
        .await
        .expect("remaining 50 is still requestable");

    let pending_id: i64 = sqlx::query_scalar(
        "SELECT id FROM payout_requests
         WHERE organizer_id = $1 AND status = 'pending' AND amount = 250",
    )
    .bind(organizer)
    .fetch_one(&pool)
    .await
    .unwrap();

    approve(&pool, &notifier, pending_id).await.unwrap();
    assert_eq!(available_balance(&pool, organizer).await.unwrap(), 50.0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn approve_is_exactly_once(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    let payout = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(100.0))
        .await
        .unwrap();

    let approved = approve(&pool, &notifier, payout.id).await.unwrap();
    assert_eq!(approved.status, "completed");
    assert!(approved.completed_at.is_some());

    // Повторная финализация невозможна, статус не меняется
    let err = approve(&pool, &notifier, payout.id).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyFinalized));

    let status: String =
        sqlx::query_scalar("SELECT status FROM payout_requests WHERE id = $1")
            .bind(payout.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "completed");
}

#[sqlx::test(migrations = "./src/migrations")]
async fn rejected_request_stores_reason_and_stays_rejected(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    let payout = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(100.0))
        .await
        .unwrap();

    let rejected = reject(&pool, &notifier, payout.id, "Account details mismatch")
        .await
        .unwrap();
    assert_eq!(rejected.status, "rejected");
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Account details mismatch")
    );

    let err = approve(&pool, &notifier, payout.id).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyFinalized));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn finalizing_missing_request_is_not_found(pool: PgPool) {
    let notifier = test_notifier();

    let err = approve(&pool, &notifier, 424242).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = reject(&pool, &notifier, 424242, "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn invalid_method_details_are_rejected_before_any_write(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    let mut bad = momo_input(100.0);
    bad.details.phone = Some("0201234567".to_string());

    let err = request_payout(&pool, &notifier, MOMO_PREFIX, organizer, bad)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidPayoutDetails(_)));

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payout_requests WHERE organizer_id = $1 AND status = 'pending'",
    )
    .bind(organizer)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn concurrent_requests_cannot_double_spend(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = organizer_with_balance_300(&pool).await;

    // Две одновременные заявки на весь баланс: advisory-лок по
    // организатору сериализует проверку, вторая видит pending первой
    let (a, b) = tokio::join!(
        request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(300.0)),
        request_payout(&pool, &notifier, MOMO_PREFIX, organizer, momo_input(300.0)),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

    let pending_total: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::float8
         FROM payout_requests WHERE organizer_id = $1 AND status = 'pending'",
    )
    .bind(organizer)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending_total, 300.0);
}
