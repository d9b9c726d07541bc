use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub is_organizer: bool,
    pub is_admin: bool,
    pub exp: i64,
}

pub fn issue_token(config: &JwtConfig, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        is_organizer: user.is_organizer,
        is_admin: user.is_admin,
        exp: (Utc::now() + chrono::Duration::hours(config.expires_in_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub is_organizer: bool,
    pub is_admin: bool,
    pub currency: String,
}

// Bearer JWT extractor. Пользователь перечитывается из БД, чтобы
// заблокированный аккаунт отваливался сразу, а не после истечения токена.
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthenticated)?
        .claims;

        let user = User::find_by_id(claims.sub, &state.db.pool)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        if user.suspended {
            return Err(ApiError::Suspended);
        }

        Ok(AuthUser {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            is_organizer: user.is_organizer,
            is_admin: user.is_admin,
            currency: user.currency,
        })
    }
}

/// Доступ только организаторам.
#[derive(Debug, Clone)]
pub struct Organizer(pub AuthUser);

impl FromRequestParts<Arc<crate::AppState>> for Organizer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_organizer {
            return Err(ApiError::Unauthorized);
        }
        Ok(Organizer(user))
    }
}

/// Доступ только администраторам.
#[derive(Debug, Clone)]
pub struct Admin(pub AuthUser);

impl FromRequestParts<Arc<crate::AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Unauthorized);
        }
        Ok(Admin(user))
    }
}
