//! notify.rs
//!
//! Сервисный слой для отправки email и SMS через внешний шлюз
//! уведомлений.
//!
//! Ключевые компоненты:
//! 1.  **CircuitBreaker**: защита от неработающего шлюза - после серии
//!     сбоев запросы временно блокируются, вместо того чтобы держать
//!     каждый запрос на таймауте.
//! 2.  **NotifyGatewayClient**: клиент шлюза; генерирует токены запросов,
//!     шлет email/SMS с ограниченным таймаутом. Отправка всегда
//!     best-effort: неудача логируется и никогда не откатывает уже
//!     закоммиченную покупку или выплату.
//! 3.  **templates**: тексты писем и SMS.
//!
//! При notify.enabled=false клиент только логирует сообщения - режим
//! для разработки и тестов.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, NotifyConfig};

/// Состояния Circuit Breaker.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    /// Нормальный режим, запросы разрешены.
    Closed,
    /// Шлюз считается недоступным, запросы блокируются до таймаута.
    Open,
    /// Пробный режим: разрешен один тестовый запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: std::sync::RwLock<CircuitState>,
    failure_count: AtomicU32,
    // Секунды с момента создания выключателя
    last_failure_at: AtomicU64,
    started: Instant,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            state: std::sync::RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure_at: AtomicU64::new(0),
            started: Instant::now(),
            failure_threshold,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    fn now_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn can_execute(&self) -> bool {
        let state = self.state.read().unwrap();

        match *state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let since_failure = self
                    .now_secs()
                    .saturating_sub(self.last_failure_at.load(Ordering::Relaxed));

                if since_failure >= self.timeout.as_secs() {
                    // Таймаут прошел - пропускаем один пробный запрос
                    drop(state);
                    *self.state.write().unwrap() = CircuitState::HalfOpen;
                    info!("Notify circuit breaker transitioning to HalfOpen");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap();

        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::Relaxed);
                info!("Notify circuit breaker recovered - Closed");
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_failure_at.store(self.now_secs(), Ordering::Relaxed);

        let mut state = self.state.write().unwrap();

        match *state {
            CircuitState::Closed => {
                if failures >= self.failure_threshold {
                    *state = CircuitState::Open;
                    error!(
                        "Notify circuit breaker OPENED - {} failures reached threshold {}",
                        failures, self.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Notify circuit breaker test failed - back to Open");
            }
            _ => {}
        }
    }

    pub fn get_state(&self) -> CircuitState {
        self.state.read().unwrap().clone()
    }
}

// --- Модели запросов к шлюзу ---

#[derive(Debug, Serialize)]
struct EmailSendRequest {
    sender: String,
    token: String,
    from: String,
    to: String,
    subject: String,
    html: String,
}

#[derive(Debug, Serialize)]
struct SmsSendRequest {
    sender: String,
    token: String,
    to: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GatewaySendResponse {
    success: bool,
    message: Option<String>,
}

/// Клиент шлюза уведомлений.
#[derive(Clone)]
pub struct NotifyGatewayClient {
    enabled: bool,
    base_url: String,
    sender_id: String,
    secret: String,
    from_email: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl NotifyGatewayClient {
    pub fn from_config(config: &NotifyConfig, breaker: &CircuitBreakerConfig) -> Self {
        Self {
            enabled: config.enabled,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            sender_id: config.sender_id.clone(),
            secret: config.secret.clone(),
            from_email: config.from_email.clone(),
            http_client: reqwest::Client::builder()
                // Отправка не должна висеть: уведомление best-effort
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                breaker.timeout_seconds,
            )),
        }
    }

    /// Токен запроса: sha256 от получателя, тела, секрета и sender id.
    fn generate_token(&self, recipient: &str, payload: &str) -> String {
        let token_string = format!("{}{}{}{}", recipient, payload, self.secret, self.sender_id);
        let mut hasher = Sha256::new();
        hasher.update(token_string.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn execute_guarded<F>(&self, operation: F) -> bool
    where
        F: std::future::Future<Output = Result<GatewaySendResponse, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Notify circuit breaker is OPEN - dropping notification");
            return false;
        }

        match operation.await {
            Ok(resp) => {
                self.circuit_breaker.record_success();
                if !resp.success {
                    warn!("Notification gateway rejected message: {:?}", resp.message);
                }
                resp.success
            }
            Err(e) => {
                error!("Notification gateway request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                false
            }
        }
    }

    /// Отправляет email. Возвращает false при любой неудаче - вызывающий
    /// код решает только, логировать или нет.
    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> bool {
        if !self.enabled {
            info!("Email (disabled) to {}: {}", to, subject);
            return true;
        }

        let request = EmailSendRequest {
            sender: self.sender_id.clone(),
            token: self.generate_token(to, html),
            from: self.from_email.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let operation = async {
            self.http_client
                .post(format!("{}/api/v1/email/send", self.base_url))
                .json(&request)
                .send()
                .await?
                .json::<GatewaySendResponse>()
                .await
        };

        self.execute_guarded(operation).await
    }

    /// Отправляет SMS. Такой же best-effort, как send_email.
    pub async fn send_sms(&self, phone: &str, message: &str) -> bool {
        if !self.enabled {
            info!("SMS (disabled) to {}: {}", phone, message);
            return true;
        }

        let request = SmsSendRequest {
            sender: self.sender_id.clone(),
            token: self.generate_token(phone, message),
            to: phone.to_string(),
            message: message.to_string(),
        };

        let operation = async {
            self.http_client
                .post(format!("{}/api/v1/sms/send", self.base_url))
                .json(&request)
                .send()
                .await?
                .json::<GatewaySendResponse>()
                .await
        };

        self.execute_guarded(operation).await
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state()
    }
}

/// Тексты уведомлений.
pub mod templates {
    /// (subject, html) подтверждения покупки.
    pub fn purchase_email(
        event_title: &str,
        quantity: i32,
        tier_name: &str,
        currency: &str,
        total: f64,
    ) -> (String, String) {
        (
            format!("Ticket Confirmation: {}", event_title),
            format!(
                "<h2>Your tickets are confirmed!</h2>\
                 <p>Event: {}</p>\
                 <p>Tickets: {} x {}</p>\
                 <p>Total: {} {:.2}</p>",
                event_title,
                quantity,
                tier_name.to_uppercase(),
                currency,
                total
            ),
        )
    }

    pub fn purchase_sms(quantity: i32, event_title: &str, tier_name: &str) -> String {
        format!(
            "Your {} ticket(s) for {} ({}) have been confirmed!",
            quantity,
            event_title,
            tier_name.to_uppercase()
        )
    }

    pub fn waitlist_joined_sms(tier_name: &str) -> String {
        format!(
            "You've joined the waitlist for {} tickets. We'll notify you when available!",
            tier_name.to_uppercase()
        )
    }

    pub fn waitlist_available_sms(tier_name: &str, event_title: &str) -> String {
        format!(
            "Good news! {} tickets for {} are now available!",
            tier_name.to_uppercase(),
            event_title
        )
    }

    pub fn payout_requested_email(amount: f64) -> (String, String) {
        (
            "Payout Requested".to_string(),
            format!(
                "<p>Your payout request of {:.2} has been received and is pending review.</p>",
                amount
            ),
        )
    }

    pub fn payout_approved_email(amount: f64) -> (String, String) {
        (
            "Payout Approved".to_string(),
            format!(
                "<p>Your payout request of {:.2} has been approved and will be processed \
                 within 3-5 business days.</p>",
                amount
            ),
        )
    }

    pub fn payout_rejected_email(reason: &str) -> (String, String) {
        (
            "Payout Rejected".to_string(),
            format!(
                "<p>Your payout request has been rejected.</p><p>Reason: {}</p>",
                reason
            ),
        )
    }

    pub fn event_cancelled_email(event_title: &str) -> (String, String) {
        (
            format!("Event Cancelled: {}", event_title),
            format!(
                "<p>Unfortunately, {} has been cancelled. A full refund will be processed.</p>",
                event_title
            ),
        )
    }

    pub fn event_cancelled_sms(event_title: &str) -> String {
        format!("{} has been cancelled. Full refund processed.", event_title)
    }

    pub fn welcome_email(name: &str) -> (String, String) {
        (
            "Welcome to Glycr!".to_string(),
            format!(
                "<h2>Welcome {}!</h2><p>Your account has been created successfully.</p>",
                name
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, 60);
        assert_eq!(breaker.get_state(), CircuitState::Closed);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn breaker_half_open_after_timeout() {
        // Нулевой таймаут: следующий can_execute сразу пробный
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);

        assert!(breaker.can_execute());
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
    }

    #[test]
    fn breaker_reopens_on_half_open_failure() {
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert!(breaker.can_execute()); // HalfOpen

        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);
    }

    #[test]
    fn token_is_deterministic() {
        let config = NotifyConfig {
            enabled: false,
            gateway_url: "https://gateway.test".to_string(),
            sender_id: "Glycr".to_string(),
            secret: "s3cret".to_string(),
            from_email: "noreply@glycr.com".to_string(),
            timeout_seconds: 10,
        };
        let breaker = CircuitBreakerConfig {
            failure_threshold: 5,
            timeout_seconds: 60,
        };
        let client = NotifyGatewayClient::from_config(&config, &breaker);

        let a = client.generate_token("+233200000001", "hello");
        let b = client.generate_token("+233200000001", "hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = client.generate_token("+233200000002", "hello");
        assert_ne!(a, c);
    }

    #[test]
    fn purchase_sms_uppercases_tier() {
        let sms = templates::purchase_sms(2, "AfroBeats Live", "vip");
        assert!(sms.contains("VIP"));
        assert!(sms.contains("2 ticket(s)"));
    }
}
