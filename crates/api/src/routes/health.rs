use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub const BANNER: &str = "✅ Signal bot is running!";

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
}

/// Plain-text probe for uptime monitors.
async fn index() -> &'static str {
    BANNER
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let status = state.watchlist.status().await;
    let members: Vec<&str> = status.members.iter().map(|i| i.name.as_str()).collect();
    Json(json!({
        "status": "ok",
        "scheduler": status.state.to_string(),
        "members": members,
    }))
}
