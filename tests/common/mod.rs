#![allow(dead_code)]

use glycr_api::config::{CircuitBreakerConfig, NotifyConfig};
use glycr_api::services::notify::NotifyGatewayClient;
use glycr_api::services::purchase::generate_ticket_id;
use sqlx::PgPool;

// Отключенный клиент уведомлений: сообщения только логируются.
pub fn test_notifier() -> NotifyGatewayClient {
    NotifyGatewayClient::from_config(
        &NotifyConfig {
            enabled: false,
            gateway_url: "http://127.0.0.1:1".to_string(),
            sender_id: "Glycr".to_string(),
            secret: "test-secret".to_string(),
            from_email: "noreply@glycr.com".to_string(),
            timeout_seconds: 1,
        },
        &CircuitBreakerConfig {
            failure_threshold: 5,
            timeout_seconds: 60,
        },
    )
}

pub async fn seed_user(pool: &PgPool, email: &str, is_organizer: bool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, phone, password, is_organizer)
         VALUES ($1, $2, '+233200000000', 'not-a-real-hash', $3)
         RETURNING id",
    )
    .bind(email.split('@').next().unwrap())
    .bind(email)
    .bind(is_organizer)
    .fetch_one(pool)
    .await
    .expect("seed user")
}

pub async fn seed_event(pool: &PgPool, organizer_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO events (title, description, date, venue, location, category, organizer_id)
         VALUES ('AfroBeats Live', 'Open air concert', NOW() + interval '30 days',
                 'National Theatre', 'Accra', 'music', $1)
         RETURNING id",
    )
    .bind(organizer_id)
    .fetch_one(pool)
    .await
    .expect("seed event")
}

pub async fn seed_tier(pool: &PgPool, event_id: i64, name: &str, price: f64, capacity: i32) {
    sqlx::query(
        "INSERT INTO ticket_tiers (event_id, name, price, capacity)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(event_id)
    .bind(name)
    .bind(price)
    .bind(capacity)
    .execute(pool)
    .await
    .expect("seed tier");
}

// Билет в обход воркфлоу покупки: для наполнения выручки в тестах выплат.
pub async fn seed_ticket(pool: &PgPool, event_id: i64, user_id: i64, price: f64) {
    sqlx::query(
        "INSERT INTO tickets (ticket_id, event_id, user_id, user_email, user_phone,
                              tier_name, price, payment_method)
         VALUES ($1, $2, $3, 'buyer@example.com', '+233200000001', 'regular', $4, 'momo')",
    )
    .bind(generate_ticket_id())
    .bind(event_id)
    .bind(user_id)
    .bind(price)
    .execute(pool)
    .await
    .expect("seed ticket");
}

pub async fn tier_sold(pool: &PgPool, event_id: i64, name: &str) -> i32 {
    sqlx::query_scalar::<_, i32>(
        "SELECT sold FROM ticket_tiers WHERE event_id = $1 AND name = $2",
    )
    .bind(event_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("tier sold")
}
