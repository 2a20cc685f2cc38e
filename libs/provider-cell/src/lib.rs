pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AvailabilityError, ProviderError};
pub use services::availability::{find_covering_slot, AvailabilityService};
pub use services::provider::ProviderService;
