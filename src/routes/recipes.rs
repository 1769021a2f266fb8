use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::models::Author;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::recipes::engagement::{self, Engagement};
use crate::recipes::repository::{
    LikeOutcome, NewRecipe, RecipeFilter, RecipeRepository, RecipeWithAuthor,
    SqliteRecipeRepository,
};
use crate::state::AppState;

/// Recipe as returned to clients: the stored document plus its author and
/// the caller-dependent derived fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: String,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub author: Author,
    pub likes_count: usize,
    #[serde(flatten)]
    pub engagement: Engagement,
    pub created_at: String,
    pub updated_at: String,
}

impl RecipeView {
    /// Annotation happens here and only here, so every recipe-returning
    /// path derives the same fields for the same inputs.
    pub fn from_entry(entry: RecipeWithAuthor, caller: Option<&str>) -> Self {
        let engagement = engagement::annotate(&entry.recipe, caller);
        let recipe = entry.recipe;
        Self {
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            category: recipe.category,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            image: recipe.image,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            author: entry.author,
            likes_count: recipe.likes.len(),
            engagement,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

/// Average/count (and the caller's own rating, when known) for one recipe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub avg: f64,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub value: i64,
}

fn caller_id(user: &MaybeUser) -> Option<&str> {
    user.0.as_ref().map(|u| u.id.as_str())
}

async fn list(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(filter): Query<RecipeFilter>,
) -> AppResult<Json<Vec<RecipeView>>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let recipes = repo.list(&filter).await?;
    let views = recipes
        .into_iter()
        .map(|entry| RecipeView::from_entry(entry, caller_id(&user)))
        .collect();
    Ok(Json(views))
}

async fn get_one(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<RecipeView>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let entry = repo.find(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(RecipeView::from_entry(entry, caller_id(&user))))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewRecipe>,
) -> AppResult<(StatusCode, Json<RecipeView>)> {
    if new.title.trim().is_empty() || new.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and description are required".to_string(),
        ));
    }

    let repo = SqliteRecipeRepository::new(state.db.clone());
    let entry = repo.create(&user.id, new).await?;
    tracing::info!("User {} created recipe {}", user.id, entry.recipe.id);

    Ok((
        StatusCode::CREATED,
        Json(RecipeView::from_entry(entry, Some(user.id.as_str()))),
    ))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let entry = repo.find(&id).await?.ok_or(AppError::NotFound)?;

    if entry.recipe.author_id != user.id {
        return Err(AppError::Forbidden(
            "Only the author can delete a recipe".to_string(),
        ));
    }

    repo.delete(&id).await?;
    Ok(Json(json!({ "message": "Recipe deleted" })))
}

async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeOutcome>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let outcome = repo.toggle_like(&id, &user.id).await?;
    Ok(Json(outcome))
}

async fn toggle_bookmark(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let bookmarked = repo.toggle_bookmark(&id, &user.id).await?;
    Ok(Json(json!({ "bookmarked": bookmarked })))
}

async fn get_rating(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<RatingView>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let entry = repo.find(&id).await?.ok_or(AppError::NotFound)?;

    let engagement = engagement::annotate(&entry.recipe, caller_id(&user));
    Ok(Json(RatingView {
        avg: engagement.average_rating,
        count: engagement.review_count,
        my_rating: engagement.my_rating,
    }))
}

async fn rate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RateRequest>,
) -> AppResult<Json<RatingView>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let summary = repo.rate(&id, &user.id, req.value).await?;
    Ok(Json(RatingView {
        avg: summary.avg,
        count: summary.count,
        my_rating: Some(req.value),
    }))
}

async fn bookmarked(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<RecipeView>>> {
    let repo = SqliteRecipeRepository::new(state.db.clone());
    let recipes = repo.bookmarked_by(&user.id).await?;
    let views = recipes
        .into_iter()
        .map(|entry| RecipeView::from_entry(entry, Some(user.id.as_str())))
        .collect();
    Ok(Json(views))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list).post(create))
        .route("/recipes/bookmarked", get(bookmarked))
        .route("/recipes/{id}", get(get_one).delete(remove))
        .route("/recipes/{id}/like", post(toggle_like))
        .route("/recipes/{id}/bookmark", post(toggle_bookmark))
        .route("/recipes/{id}/rate", get(get_rating).post(rate))
}
