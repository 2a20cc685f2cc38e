pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::NotificationError;
pub use services::notification::NotificationService;
