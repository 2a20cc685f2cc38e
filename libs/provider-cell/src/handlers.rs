use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::accounts::ProviderProfile;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::interval::TimeSlot;
use shared_store::AppState;

use crate::models::{AvailabilityError, CreateProviderRequest, ProviderError, SlotRequest};
use crate::services::availability::AvailabilityService;
use crate::services::provider::ProviderService;

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Caller id is not a valid identifier".to_string()))
}

/// Availability is mutated by its owner or an administrator, nobody else.
fn ensure_owner_or_admin(user: &User, provider_id: Uuid) -> Result<(), AppError> {
    let caller = caller_uuid(user)?;
    if caller != provider_id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to manage this provider's availability".to_string(),
        ));
    }
    Ok(())
}

fn map_provider_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::AccountNotFound | ProviderError::NotFound => {
            AppError::NotFound(e.to_string())
        }
        ProviderError::NotAProvider => AppError::Forbidden(e.to_string()),
        ProviderError::AlreadyExists => AppError::Conflict(e.to_string()),
    }
}

fn map_availability_error(e: AvailabilityError) -> AppError {
    match e {
        AvailabilityError::ProviderNotFound => AppError::NotFound(e.to_string()),
        AvailabilityError::InvalidSlot(inner) => AppError::ValidationError(inner.to_string()),
        AvailabilityError::PastDate => AppError::ValidationError(e.to_string()),
        AvailabilityError::Overlap => AppError::Conflict(e.to_string()),
        AvailabilityError::IndexOutOfBounds(_) => AppError::NotFound(e.to_string()),
        AvailabilityError::Storage(msg) => AppError::Storage(msg),
    }
}

fn parse_slot(request: &SlotRequest) -> Result<TimeSlot, AppError> {
    TimeSlot::parse(&request.date, &request.start_time, &request.end_time)
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = ProviderService::new(Arc::clone(&state.store));
    let providers = service.list_providers().await;

    Ok(Json(json!({
        "providers": providers,
        "total": providers.len()
    })))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<ProviderProfile>, AppError> {
    let service = ProviderService::new(Arc::clone(&state.store));
    let provider = service
        .get_provider(provider_id)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(provider))
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(Arc::clone(&state.store));
    let slots = service
        .list_slots(provider_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "availability": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    let service = ProviderService::new(Arc::clone(&state.store));
    let profile = service
        .create_profile(caller, request)
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({ "provider": profile })))
}

#[axum::debug_handler]
pub async fn add_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<SlotRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;
    let slot = parse_slot(&request)?;

    let service = AvailabilityService::new(Arc::clone(&state.store));
    let created = service
        .add_slot(provider_id, slot)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({ "slot": created })))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((provider_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<SlotRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;
    let slot = parse_slot(&request)?;

    let service = AvailabilityService::new(Arc::clone(&state.store));
    let updated = service
        .update_slot(provider_id, index, slot)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({ "slot": updated })))
}

#[axum::debug_handler]
pub async fn remove_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((provider_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;

    let service = AvailabilityService::new(Arc::clone(&state.store));
    let removed = service
        .remove_slot(provider_id, index)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({ "removed": removed })))
}
