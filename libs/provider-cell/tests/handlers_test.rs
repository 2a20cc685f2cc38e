use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;

use provider_cell::router::provider_routes;
use shared_models::accounts::{Role, UserAccount};
use shared_store::AppState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(state: Arc<AppState>) -> Router {
    provider_routes(state)
}

fn slot_date() -> String {
    (Utc::now() + Duration::days(30))
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

/// Registers the account behind a token so role checks pass.
async fn register_user(state: &AppState, user: &TestUser, role: Role, name: &str) {
    let account = UserAccount {
        id: user.uuid(),
        email: user.email.clone(),
        display_name: name.to_string(),
        role,
        created_at: Utc::now(),
    };
    state.store.users.insert(account.id, account).await;
}

fn slot_request(token: &str, uri: &str, method: &str, payload: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn provider_creates_profile_then_publishes_availability() {
    let config = TestConfig::default();
    let state = config.to_state();
    let app = create_test_app(state.clone());

    let provider_user = TestUser::provider("imani@example.edu");
    register_user(&state, &provider_user, Role::Provider, "Dr Imani").await;
    let token = JwtTestUtils::create_test_token(&provider_user, &config.jwt_secret, None);

    let response = app
        .clone()
        .oneshot(slot_request(
            &token,
            "/",
            "POST",
            &json!({ "display_name": "Dr Imani", "title": "Psychiatrist" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/{}/availability", provider_user.uuid());
    let response = app
        .clone()
        .oneshot(slot_request(
            &token,
            &uri,
            "POST",
            &json!({ "date": slot_date(), "start_time": "09:00", "end_time": "10:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Public listing needs no token.
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let availability = state
        .store
        .providers
        .get(provider_user.uuid())
        .await
        .unwrap()
        .availability;
    assert_eq!(availability.len(), 1);
}

#[tokio::test]
async fn only_owner_or_admin_mutates_availability() {
    let config = TestConfig::default();
    let state = config.to_state();
    let app = create_test_app(state.clone());

    let provider_user = TestUser::provider("imani@example.edu");
    register_user(&state, &provider_user, Role::Provider, "Dr Imani").await;
    let stranger = TestUser::requester("sam@example.edu");
    register_user(&state, &stranger, Role::Requester, "Sam Student").await;

    let uri = format!("/{}/availability", provider_user.uuid());
    let stranger_token = JwtTestUtils::create_test_token(&stranger, &config.jwt_secret, None);

    let response = app
        .oneshot(slot_request(
            &stranger_token,
            &uri,
            "POST",
            &json!({ "date": slot_date(), "start_time": "09:00", "end_time": "10:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inverted_times_are_a_validation_error() {
    let config = TestConfig::default();
    let state = config.to_state();
    let app = create_test_app(state.clone());

    let provider_user = TestUser::provider("imani@example.edu");
    register_user(&state, &provider_user, Role::Provider, "Dr Imani").await;
    let token = JwtTestUtils::create_test_token(&provider_user, &config.jwt_secret, None);

    let uri = format!("/{}/availability", provider_user.uuid());
    let response = app
        .oneshot(slot_request(
            &token,
            &uri,
            "POST",
            &json!({ "date": slot_date(), "start_time": "10:00", "end_time": "09:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn removing_a_missing_index_is_not_found() {
    let config = TestConfig::default();
    let state = config.to_state();
    let app = create_test_app(state.clone());

    let provider_user = TestUser::provider("imani@example.edu");
    register_user(&state, &provider_user, Role::Provider, "Dr Imani").await;
    let token = JwtTestUtils::create_test_token(&provider_user, &config.jwt_secret, None);

    // Profile exists but has no slots.
    let create = slot_request(
        &token,
        "/",
        "POST",
        &json!({ "display_name": "Dr Imani", "title": null }),
    );
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/{}/availability/0", provider_user.uuid());
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
