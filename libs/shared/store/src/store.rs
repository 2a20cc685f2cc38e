use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::accounts::{ProviderProfile, UserAccount};
use shared_models::appointment::Appointment;
use shared_models::notification::{Notification, Reminder};

use crate::collection::Collection;

/// Per-provider mutual-exclusion scope. Every availability mutation and
/// every booking against a provider runs while holding that provider's
/// mutex, so two requests can never both consume the same covering slot.
pub struct ProviderLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProviderLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn lock_for(&self, provider_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().await;
        Arc::clone(
            locks
                .entry(provider_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// The document store shared by every cell.
pub struct Datastore {
    pub users: Collection<UserAccount>,
    pub providers: Collection<ProviderProfile>,
    pub appointments: Collection<Appointment>,
    pub notifications: Collection<Notification>,
    pub reminders: Collection<Reminder>,
    locks: ProviderLocks,
}

impl Datastore {
    pub fn new() -> Self {
        Self {
            users: Collection::new("users"),
            providers: Collection::new("providers"),
            appointments: Collection::new("appointments"),
            notifications: Collection::new("notifications"),
            reminders: Collection::new("reminders"),
            locks: ProviderLocks::new(),
        }
    }

    pub async fn provider_lock(&self, provider_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.lock_for(provider_id).await
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared axum state: configuration plus the datastore.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<Datastore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: Arc::new(Datastore::new()),
        }
    }
}
