use serde::Deserialize;

use shared_models::interval::TimeSlotError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProviderRequest {
    pub display_name: String,
    pub title: Option<String>,
}

/// Boundary shape for slot mutations; times are strict `HH:MM` strings,
/// dates `YYYY-MM-DD`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider account not found")]
    AccountNotFound,

    #[error("Account does not have the provider role")]
    NotAProvider,

    #[error("Provider profile already exists")]
    AlreadyExists,

    #[error("Provider not found")]
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Provider not found")]
    ProviderNotFound,

    #[error(transparent)]
    InvalidSlot(#[from] TimeSlotError),

    #[error("Slot date is in the past")]
    PastDate,

    #[error("Slot overlaps an existing open slot")]
    Overlap,

    #[error("No availability slot at index {0}")]
    IndexOutOfBounds(usize),

    #[error("Storage error: {0}")]
    Storage(String),
}
