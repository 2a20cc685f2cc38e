use std::sync::Arc;

use axum::{routing::get, Router};

use account_cell::router::account_routes;
use appointment_cell::router::appointment_routes;
use notification_cell::router::notification_routes;
use provider_cell::router::provider_routes;
use shared_store::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "CampusCare API is running!" }))
        .nest("/accounts", account_routes(state.clone()))
        .nest("/providers", provider_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/notifications", notification_routes(state))
}
