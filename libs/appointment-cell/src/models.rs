use serde::Deserialize;
use uuid::Uuid;

use shared_models::appointment::AppointmentStatus;
use shared_models::interval::TimeSlotError;

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub provider_id: Uuid,
    /// Defaults to the caller; only administrators may book for others.
    pub requester_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Requester account not found")]
    RequesterNotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Caller is not allowed to perform this operation")]
    Forbidden,

    #[error(transparent)]
    InvalidSlot(#[from] TimeSlotError),

    #[error("This interval is already booked")]
    AlreadyBooked,

    #[error("No open slot covers the requested interval")]
    SlotNotAvailable,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}
