use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::json;

use crate::comments::repository::{CommentRepository, NewComment, SqliteCommentRepository};
use crate::comments::threading::{self, CommentThread, CommentView};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::recipes::repository::{RecipeRepository, SqliteRecipeRepository};
use crate::state::AppState;

async fn list(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> AppResult<Json<Vec<CommentThread>>> {
    let repo = SqliteCommentRepository::new(state.db.clone());
    let flat = repo.list_for_recipe(&recipe_id).await?;
    Ok(Json(threading::build_tree(flat)))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(recipe_id): Path<String>,
    Json(new): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let repo = SqliteCommentRepository::new(state.db.clone());
    let view = repo.create(&recipe_id, &user.id, new).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((recipe_id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let comments = SqliteCommentRepository::new(state.db.clone());
    let comment = comments
        .find(&comment_id)
        .await?
        .filter(|c| c.recipe_id == recipe_id)
        .ok_or(AppError::NotFound)?;

    // The recipe author may moderate any comment under their recipe
    let recipes = SqliteRecipeRepository::new(state.db.clone());
    let recipe_author = recipes
        .find(&comment.recipe_id)
        .await?
        .map(|entry| entry.recipe.author_id)
        .unwrap_or_default();

    threading::authorize_delete(&comment, &recipe_author, &user.id)
        .map_err(|e| AppError::Forbidden(e.to_string()))?;

    comments.delete_with_replies(&comment_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/{id}/comments", get(list).post(create))
        .route("/recipes/{id}/comments/{comment_id}", delete(remove))
}
