pub mod collection;
pub mod store;

pub use collection::{Collection, StoreError};
pub use store::{AppState, Datastore, ProviderLocks};
