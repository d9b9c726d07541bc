use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

// Все ошибки, которые уходят клиенту. Роутинг-слой просто мапит их
// в статус + {"error": "..."}.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Account suspended")]
    Suspended,

    #[error("Invalid ticket type")]
    InvalidTier,

    #[error("Event is no longer available")]
    EventUnavailable,

    #[error("Not enough tickets available")]
    InsufficientInventory,

    #[error("Billing address is required for corporate purchases")]
    MissingBillingAddress,

    #[error("Invalid payout details: {0}")]
    InvalidPayoutDetails(&'static str),

    #[error("Amount exceeds available balance")]
    InsufficientBalance,

    #[error("Already on waitlist")]
    AlreadyWaitlisted,

    #[error("Payout request already finalized")]
    AlreadyFinalized,

    #[error("Ticket already validated")]
    AlreadyValidated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    // Повторно сгенерированный ticket_id. Покупка прерывается, не
    // перезаписываем чужой билет.
    #[error("Duplicate ticket id generated")]
    TicketIdCollision,

    #[error("Server error")]
    Internal(String),

    #[error("Server error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized | ApiError::Suspended => StatusCode::FORBIDDEN,
            ApiError::InvalidTier
            | ApiError::EventUnavailable
            | ApiError::InsufficientInventory
            | ApiError::MissingBillingAddress
            | ApiError::InvalidPayoutDetails(_)
            | ApiError::InsufficientBalance
            | ApiError::AlreadyWaitlisted
            | ApiError::AlreadyValidated
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadyFinalized | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TicketIdCollision | ApiError::Internal(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {:?}", self);
        }

        // Наружу не выдаём внутренние детали
        let message = match &self {
            ApiError::Database(_) | ApiError::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors_map_to_4xx() {
        assert_eq!(ApiError::NotFound("Event").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidTier.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InsufficientInventory.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::AlreadyFinalized.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn integrity_faults_map_to_500() {
        assert_eq!(
            ApiError::TicketIdCollision.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
