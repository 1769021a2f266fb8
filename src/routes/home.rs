use axum::Json;
use serde_json::{json, Value};

/// Liveness ping.
pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Cookly API running" }))
}
