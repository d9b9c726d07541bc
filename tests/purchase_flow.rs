mod common;

use common::{seed_event, seed_tier, seed_user, test_notifier, tier_sold};
use glycr_api::error::ApiError;
use glycr_api::services::purchase::{purchase, Buyer, PurchaseOrder};
use sqlx::PgPool;

fn buyer(user_id: i64) -> Buyer {
    Buyer {
        user_id,
        email: "buyer@example.com".to_string(),
        phone: "+233200000001".to_string(),
    }
}

fn order(event_id: i64, tier: &str, quantity: i32) -> PurchaseOrder {
    PurchaseOrder {
        event_id,
        tier_name: tier.to_string(),
        quantity,
        payment_method: "momo".to_string(),
        company_name: None,
        billing_address: None,
        po_number: None,
    }
}

#[sqlx::test(migrations = "./src/migrations")]
async fn purchase_depletes_inventory_and_rejects_oversell(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "regular", 50.0, 2).await;

    let outcome = purchase(&pool, &notifier, buyer(user), order(event, "regular", 2))
        .await
        .expect("purchase should succeed");

    assert_eq!(outcome.tickets.len(), 2);
    assert_eq!(outcome.total, 100.0);
    assert_eq!(tier_sold(&pool, event, "regular").await, 2);

    // Все билеты несут одну и ту же зафиксированную цену и разные id
    assert!(outcome.tickets.iter().all(|t| t.price == 50.0));
    assert_ne!(outcome.tickets[0].ticket_id, outcome.tickets[1].ticket_id);

    let err = purchase(&pool, &notifier, buyer(user), order(event, "regular", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientInventory));
    assert_eq!(tier_sold(&pool, event, "regular").await, 2);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn concurrent_purchases_cannot_oversell(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "vip", 200.0, 1).await;

    let (a, b) = tokio::join!(
        purchase(&pool, &notifier, buyer(user), order(event, "vip", 1)),
        purchase(&pool, &notifier, buyer(user), order(event, "vip", 1)),
    );

    // Ровно одна из двух одновременных покупок последнего билета проходит
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(tier_sold(&pool, event, "vip").await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn tier_lookup_is_case_insensitive(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "vip", 200.0, 10).await;

    let outcome = purchase(&pool, &notifier, buyer(user), order(event, "VIP", 1))
        .await
        .expect("case-insensitive tier lookup");
    assert_eq!(outcome.tickets[0].tier_name, "vip");
}

#[sqlx::test(migrations = "./src/migrations")]
async fn rejects_missing_event_unknown_tier_and_cancelled_event(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "regular", 50.0, 10).await;

    let err = purchase(&pool, &notifier, buyer(user), order(9999, "regular", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = purchase(&pool, &notifier, buyer(user), order(event, "platinum", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidTier));

    sqlx::query("UPDATE events SET is_cancelled = TRUE WHERE id = $1")
        .bind(event)
        .execute(&pool)
        .await
        .unwrap();

    let err = purchase(&pool, &notifier, buyer(user), order(event, "regular", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::EventUnavailable));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn zero_and_negative_quantities_are_rejected(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "regular", 50.0, 10).await;

    for quantity in [0, -3] {
        let err = purchase(
            &pool,
            &notifier,
            buyer(user),
            order(event, "regular", quantity),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientInventory));
    }
    assert_eq!(tier_sold(&pool, event, "regular").await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn corporate_purchase_without_billing_address_fails_before_reserving(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "regular", 50.0, 10).await;

    let mut corporate = order(event, "regular", 5);
    corporate.company_name = Some("Acme Ltd".to_string());

    let err = purchase(&pool, &notifier, buyer(user), corporate)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingBillingAddress));

    // Счетчик не тронут: валидация происходит до резервирования
    assert_eq!(tier_sold(&pool, event, "regular").await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn group_discount_is_applied_to_purchase_total(pool: PgPool) {
    let notifier = test_notifier();
    let organizer = seed_user(&pool, "org@example.com", true).await;
    let user = seed_user(&pool, "buyer@example.com", false).await;
    let event = seed_event(&pool, organizer).await;
    seed_tier(&pool, event, "regular", 100.0, 50).await;

    // Скидка по умолчанию 10%: 5 билетов по 90
    let outcome = purchase(&pool, &notifier, buyer(user), order(event, "regular", 5))
        .await
        .expect("group purchase");
    assert_eq!(outcome.tickets[0].price, 90.0);
    assert_eq!(outcome.total, 450.0);
}
