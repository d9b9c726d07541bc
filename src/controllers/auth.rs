use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{issue_token, AuthUser};
use crate::models::User;
use crate::services::notify::templates;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

/* ---------- payloads ---------- */

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    phone: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    password: String,
    #[serde(rename = "isOrganizer", default)]
    is_organizer: bool,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserView {
    id: i64,
    name: String,
    email: String,
    phone: String,
    #[serde(rename = "isOrganizer")]
    is_organizer: bool,
    #[serde(rename = "isAdmin")]
    is_admin: bool,
    currency: String,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        UserView {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            is_organizer: u.is_organizer,
            is_admin: u.is_admin,
            currency: u.currency.clone(),
        }
    }
}

/* ---------- handlers ---------- */

// POST /api/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if User::find_by_email(&req.email, &state.db.pool)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let hashed = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, phone, password, is_organizer)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(req.email.trim().to_lowercase())
    .bind(req.phone.trim())
    .bind(&hashed)
    .bind(req.is_organizer)
    .fetch_one(&state.db.pool)
    .await?;

    let token = issue_token(&state.config.jwt, &user)
        .map_err(|e| ApiError::Internal(format!("Token issue failed: {}", e)))?;

    // Приветственное письмо не влияет на регистрацию
    let notifier = state.notifier.clone();
    let name = user.name.clone();
    let email = user.email.clone();
    tokio::spawn(async move {
        let (subject, html) = templates::welcome_email(&name);
        if !notifier.send_email(&email, &subject, &html).await {
            warn!("Welcome email to {} failed", email);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": UserView::from(&user),
        })),
    ))
}

// POST /api/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_email(&req.email, &state.db.pool)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if user.suspended {
        return Err(ApiError::Suspended);
    }

    let valid = bcrypt::verify(&req.password, &user.password).unwrap_or(false);
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&state.config.jwt, &user)
        .map_err(|e| ApiError::Internal(format!("Token issue failed: {}", e)))?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": UserView::from(&user),
    })))
}

// GET /api/me
async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_id(user.id, &state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(user))
}

// PUT /api/profile
#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    phone: Option<String>,
    currency: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            currency = COALESCE($4, currency)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.currency)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(json!({ "message": "Profile updated", "user": updated })))
}
