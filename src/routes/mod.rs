pub mod auth;
pub mod comments;
pub mod home;
pub mod recipes;
pub mod users;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router. The API is consumed cross-origin
/// by a browser client, hence the permissive CORS layer.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(recipes::router())
        .merge(comments::router())
        .merge(users::router());

    Router::new()
        .route("/", get(home::index))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
