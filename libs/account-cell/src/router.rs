use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_store::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn account_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/register", post(handlers::register_account))
        .route("/me", get(handlers::get_own_account))
        .route("/{account_id}", get(handlers::get_account))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
