use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::password;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::recipes::repository::{RecipeRepository, SqliteRecipeRepository};
use crate::routes::recipes::RecipeView;
use crate::state::AppState;
use crate::users::repository::{ProfileUpdate, SqliteUserRepository, UserRepository};

/// Another user's profile with their privacy preferences applied.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: String,
}

impl PublicProfile {
    fn from_user(user: User) -> Self {
        let settings = &user.settings;
        Self {
            email: settings.show_email.then(|| user.email.clone()),
            bio: settings.show_bio.then(|| user.bio.clone()),
            location: settings.show_location.then(|| user.location.clone()),
            id: user.id,
            name: user.name,
            avatar: user.avatar,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let repo = SqliteUserRepository::new(state.db.clone());
    let me = repo.find_by_id(&user.id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(me))
}

async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let repo = SqliteUserRepository::new(state.db.clone());
    let updated = repo.update_profile(&user.id, update).await?;
    Ok(Json(updated))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if req.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "New password must not be empty".to_string(),
        ));
    }

    let repo = SqliteUserRepository::new(state.db.clone());
    let me = repo.find_by_id(&user.id).await?.ok_or(AppError::NotFound)?;

    if !password::verify_password(&req.current_password, &me.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let hash = password::hash_password(&req.new_password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    repo.set_password_hash(&user.id, &hash).await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn my_recipes(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<RecipeView>>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let recipes = repo.by_author(&user.id).await?;
    let views = recipes
        .into_iter()
        .map(|entry| RecipeView::from_entry(entry, Some(user.id.as_str())))
        .collect();
    Ok(Json(views))
}

async fn delete_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let repo = SqliteUserRepository::new(state.db.clone());
    repo.delete_account(&user.id).await?;
    tracing::info!("Deleted account {}", user.id);
    Ok(Json(json!({ "message": "Account deleted" })))
}

async fn profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    let repo = SqliteUserRepository::new(state.db.clone());
    let user = repo.find_by_id(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(PublicProfile::from_user(user)))
}

async fn user_recipes(
    State(state): State<AppState>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<RecipeView>>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let recipes = repo.by_author(&id).await?;
    let caller_id = caller.0.as_ref().map(|u| u.id.as_str());
    let views = recipes
        .into_iter()
        .map(|entry| RecipeView::from_entry(entry, caller_id))
        .collect();
    Ok(Json(views))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me).put(update_me).delete(delete_me))
        .route("/users/me/password", put(change_password))
        .route("/users/me/recipes", get(my_recipes))
        .route("/users/{id}", get(profile))
        .route("/users/{id}/recipes", get(user_recipes))
}
