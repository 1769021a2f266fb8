use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{password, session};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{bearer_token, CurrentUser};
use crate::state::AppState;
use crate::users::repository::{NewUser, SqliteUserRepository, UserRepository};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email and password are required".to_string(),
        ));
    }

    let repo = SqliteUserRepository::new(state.db.clone());

    if repo.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let hash =
        password::hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let user = repo
        .create(NewUser {
            name: req.name,
            email: req.email,
            password_hash: hash,
            bio: req.bio,
            location: req.location,
            avatar: req.avatar.unwrap_or_else(|| "/avatars/avatar1.png".to_string()),
        })
        .await?;

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    tracing::info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let repo = SqliteUserRepository::new(state.db.clone());

    // Same rejection whether the email or the password is wrong
    let user = repo
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    Ok(Json(AuthResponse { token, user }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    session::delete_session(&state.db, token)?;
    Ok(Json(json!({ "message": "Logged out" })))
}
