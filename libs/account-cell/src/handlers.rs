use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::accounts::UserAccount;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_store::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub display_name: String,
}

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Caller id is not a valid identifier".to_string()))
}

/// Materialize the verified identity as a platform account. Idempotent:
/// re-registering returns the existing account untouched.
#[axum::debug_handler]
pub async fn register_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterAccountRequest>,
) -> Result<Json<Value>, AppError> {
    let id = caller_uuid(&user)?;
    let role = user
        .parsed_role()
        .ok_or_else(|| AppError::Forbidden("Token carries no recognized role".to_string()))?;

    if let Some(existing) = state.store.users.get(id).await {
        debug!("Account {} already registered", id);
        return Ok(Json(json!({ "account": existing, "created": false })));
    }

    if request.display_name.trim().is_empty() {
        return Err(AppError::ValidationError("Display name cannot be empty".to_string()));
    }

    let account = UserAccount {
        id,
        email: user.email.clone().unwrap_or_default(),
        display_name: request.display_name.trim().to_string(),
        role,
        created_at: chrono::Utc::now(),
    };
    state.store.users.insert(id, account.clone()).await;

    debug!("Registered {} account {}", role, id);
    Ok(Json(json!({ "account": account, "created": true })))
}

#[axum::debug_handler]
pub async fn get_own_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserAccount>, AppError> {
    let id = caller_uuid(&user)?;

    let account = state
        .store
        .users
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Account not registered".to_string()))?;

    Ok(Json(account))
}

/// Used by tests and admin tooling to confirm a role binding exists.
#[axum::debug_handler]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<UserAccount>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators may look up accounts".to_string()));
    }

    let account = state
        .store
        .users
        .get(account_id)
        .await
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    Ok(Json(account))
}
