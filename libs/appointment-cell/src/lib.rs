pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{BookAppointmentRequest, BookingError, UpdateStatusRequest};
pub use services::booking::BookingService;
pub use services::lifecycle::LifecycleService;
