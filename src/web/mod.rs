pub mod admin;
pub mod public;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", public::router(state.clone()))
        .nest("/api/admin", admin::router(state))
}
