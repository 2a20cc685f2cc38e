use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::accounts::{ProviderProfile, Role};
use shared_store::Datastore;

use crate::models::{CreateProviderRequest, ProviderError};

pub struct ProviderService {
    store: Arc<Datastore>,
}

impl ProviderService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    /// Create the provider's profile. The account must already exist and
    /// carry the provider role; a profile starts with no open slots.
    pub async fn create_profile(
        &self,
        account_id: Uuid,
        request: CreateProviderRequest,
    ) -> Result<ProviderProfile, ProviderError> {
        let account = self
            .store
            .users
            .get(account_id)
            .await
            .ok_or(ProviderError::AccountNotFound)?;

        if account.role != Role::Provider {
            return Err(ProviderError::NotAProvider);
        }

        if self.store.providers.get(account_id).await.is_some() {
            return Err(ProviderError::AlreadyExists);
        }

        let now = Utc::now();
        let profile = ProviderProfile {
            id: account_id,
            display_name: request.display_name,
            title: request.title.unwrap_or_else(|| "Psychiatrist".to_string()),
            availability: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store.providers.insert(profile.id, profile.clone()).await;
        info!("Created provider profile {}", profile.id);
        Ok(profile)
    }

    pub async fn get_provider(&self, provider_id: Uuid) -> Result<ProviderProfile, ProviderError> {
        self.store
            .providers
            .get(provider_id)
            .await
            .ok_or(ProviderError::NotFound)
    }

    pub async fn list_providers(&self) -> Vec<ProviderProfile> {
        let mut providers = self.store.providers.all().await;
        providers.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        debug!("Listing {} providers", providers.len());
        providers
    }
}
