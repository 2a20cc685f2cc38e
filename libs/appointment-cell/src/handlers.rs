use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::accounts::Role;
use shared_models::appointment::Appointment;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::interval::TimeSlot;
use shared_store::AppState;

use crate::models::{BookAppointmentRequest, BookingError, UpdateStatusRequest};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Caller id is not a valid identifier".to_string()))
}

fn caller_role(user: &User) -> Result<Role, AppError> {
    user.parsed_role()
        .ok_or_else(|| AppError::Forbidden("Token carries no recognized role".to_string()))
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::RequesterNotFound
        | BookingError::ProviderNotFound
        | BookingError::AppointmentNotFound => AppError::NotFound(e.to_string()),
        BookingError::Forbidden => AppError::Forbidden(e.to_string()),
        BookingError::InvalidSlot(inner) => AppError::ValidationError(inner.to_string()),
        BookingError::AlreadyBooked | BookingError::SlotNotAvailable => {
            AppError::Conflict(e.to_string())
        }
        BookingError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
        BookingError::Storage(msg) => AppError::Storage(msg),
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    // A requester books for themself; only admins book on behalf of
    // someone else.
    let requester_id = request.requester_id.unwrap_or(caller);
    if requester_id != caller && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to book for another requester".to_string(),
        ));
    }

    let requested = TimeSlot::parse(&request.date, &request.start_time, &request.end_time)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let service = BookingService::new(Arc::clone(&state.store));
    let appointment = service
        .book_appointment(request.provider_id, requester_id, requested)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointment": appointment,
        "message": "Appointment requested; awaiting provider confirmation"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let caller = caller_uuid(&user)?;

    let service = BookingService::new(Arc::clone(&state.store));
    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    let is_party = appointment.requester_id == caller || appointment.provider_id == caller;
    if !is_party && !user.is_admin() {
        return Err(AppError::NotFound("Appointment not found".to_string()));
    }

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;
    let role = caller_role(&user)?;

    let service = BookingService::new(Arc::clone(&state.store));
    let appointments = service.list_for_user(caller, role).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;
    let role = caller_role(&user)?;

    let service = LifecycleService::new(
        Arc::clone(&state.store),
        state.config.reminder_lead_minutes,
    );
    let appointment = service
        .set_status(appointment_id, caller, role, request.status)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;
    let role = caller_role(&user)?;

    let service = BookingService::new(Arc::clone(&state.store));
    service
        .delete_appointment(appointment_id, caller, role)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "deleted": appointment_id })))
}
