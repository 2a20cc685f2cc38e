use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_store::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn provider_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_providers))
        .route("/{provider_id}", get(handlers::get_provider))
        .route("/{provider_id}/availability", get(handlers::list_availability));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_provider))
        .route("/{provider_id}/availability", post(handlers::add_availability))
        .route(
            "/{provider_id}/availability/{index}",
            put(handlers::update_availability),
        )
        .route(
            "/{provider_id}/availability/{index}",
            delete(handlers::remove_availability),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
