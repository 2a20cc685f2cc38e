use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::NotificationError;
use crate::services::notification::NotificationService;

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Caller id is not a valid identifier".to_string()))
}

fn map_notification_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound(_) => AppError::NotFound("Notification not found".to_string()),
        NotificationError::Forbidden(_) => {
            AppError::Forbidden("Notification belongs to another user".to_string())
        }
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    let service = NotificationService::new(Arc::clone(&state.store));
    let notifications = service.list_for_user(caller).await;

    Ok(Json(json!({
        "notifications": notifications,
        "total": notifications.len()
    })))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    let service = NotificationService::new(Arc::clone(&state.store));
    let count = service.unread_count(caller).await;

    Ok(Json(json!({ "unread": count })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    let service = NotificationService::new(Arc::clone(&state.store));
    let notification = service
        .mark_read(notification_id, caller)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(json!({ "notification": notification })))
}
