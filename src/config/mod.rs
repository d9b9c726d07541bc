use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub notify: NotifyConfig,
    pub payout: PayoutConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

// Настройки шлюза уведомлений (email + SMS).
// При enabled=false сообщения только логируются.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub gateway_url: String,
    pub sender_id: String,
    pub secret: String,
    pub from_email: String,
    pub timeout_seconds: u64,
}

// Настройки выплат организаторам
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    // Региональный формат номера mobile money: префикс + 9 цифр
    pub momo_prefix: String,
    pub platform_fee_percent: f64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "glycr_api=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string()),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                expires_in_hours: env::var("JWT_EXPIRES_IN_HOURS")
                    .unwrap_or_else(|_| "168".to_string())
                    .parse()
                    .expect("JWT_EXPIRES_IN_HOURS must be a valid number"),
            },
            notify: NotifyConfig {
                enabled: env::var("NOTIFY_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .expect("NOTIFY_ENABLED must be true or false"),
                gateway_url: env::var("NOTIFY_GATEWAY_URL")
                    .unwrap_or_else(|_| "https://gateway.glycr.com".to_string()),
                sender_id: env::var("NOTIFY_SENDER_ID").unwrap_or_else(|_| "Glycr".to_string()),
                secret: env::var("NOTIFY_SECRET").unwrap_or_default(),
                from_email: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "noreply@glycr.com".to_string()),
                timeout_seconds: env::var("NOTIFY_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("NOTIFY_TIMEOUT_SECONDS must be a valid number"),
            },
            payout: PayoutConfig {
                momo_prefix: env::var("PAYOUT_MOMO_PREFIX").unwrap_or_else(|_| "+233".to_string()),
                platform_fee_percent: env::var("PLATFORM_FEE_PERCENT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("PLATFORM_FEE_PERCENT must be a valid number"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env::var("CIRCUIT_BREAKER_FAILURE_THRESHOLD")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_FAILURE_THRESHOLD must be a valid number"),
                timeout_seconds: env::var("CIRCUIT_BREAKER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_TIMEOUT_SECONDS must be a valid number"),
            },
        }
    }
}
