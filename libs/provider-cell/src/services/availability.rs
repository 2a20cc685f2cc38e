use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::accounts::AvailabilitySlot;
use shared_models::interval::TimeSlot;
use shared_store::Datastore;

use crate::models::AvailabilityError;

/// First slot in stored order that fully contains the requested
/// interval. Deterministic but order-dependent; no smarter tie-break.
pub fn find_covering_slot(slots: &[AvailabilitySlot], requested: &TimeSlot) -> Option<usize> {
    slots.iter().position(|s| s.slot.contains(requested))
}

/// Open-slot management for one provider. Every mutation runs under the
/// provider's lock so it can never interleave with a booking consuming
/// the same calendar.
///
/// Callers address slots by position, a legacy contract: indices shift
/// after a removal, so they must not be cached across mutations. Each
/// slot also carries a stable id, which index operations resolve to
/// before touching anything.
pub struct AvailabilityService {
    store: Arc<Datastore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn add_slot(
        &self,
        provider_id: Uuid,
        slot: TimeSlot,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        let lock = self.store.provider_lock(provider_id).await;
        let _guard = lock.lock().await;

        let profile = self
            .store
            .providers
            .get(provider_id)
            .await
            .ok_or(AvailabilityError::ProviderNotFound)?;

        Self::validate_slot_date(&slot)?;
        if profile.availability.iter().any(|s| s.slot.overlaps(&slot)) {
            return Err(AvailabilityError::Overlap);
        }

        let created = AvailabilitySlot::new(slot);
        let slot_id = created.id;
        self.store
            .providers
            .update(provider_id, |p| {
                p.availability.push(created.clone());
                p.updated_at = Utc::now();
            })
            .await
            .map_err(|e| AvailabilityError::Storage(e.to_string()))?;

        info!("Provider {} added availability slot {}", provider_id, slot_id);
        Ok(created)
    }

    pub async fn list_slots(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        let profile = self
            .store
            .providers
            .get(provider_id)
            .await
            .ok_or(AvailabilityError::ProviderNotFound)?;
        Ok(profile.availability)
    }

    pub async fn remove_slot(
        &self,
        provider_id: Uuid,
        index: usize,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        let lock = self.store.provider_lock(provider_id).await;
        let _guard = lock.lock().await;

        let profile = self
            .store
            .providers
            .get(provider_id)
            .await
            .ok_or(AvailabilityError::ProviderNotFound)?;

        let slot_id = profile
            .availability
            .get(index)
            .map(|s| s.id)
            .ok_or(AvailabilityError::IndexOutOfBounds(index))?;

        let mut removed = None;
        self.store
            .providers
            .update(provider_id, |p| {
                if let Some(pos) = p.availability.iter().position(|s| s.id == slot_id) {
                    removed = Some(p.availability.remove(pos));
                    p.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| AvailabilityError::Storage(e.to_string()))?;

        debug!("Provider {} removed availability slot {}", provider_id, slot_id);
        removed.ok_or(AvailabilityError::IndexOutOfBounds(index))
    }

    pub async fn update_slot(
        &self,
        provider_id: Uuid,
        index: usize,
        slot: TimeSlot,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        let lock = self.store.provider_lock(provider_id).await;
        let _guard = lock.lock().await;

        let profile = self
            .store
            .providers
            .get(provider_id)
            .await
            .ok_or(AvailabilityError::ProviderNotFound)?;

        let slot_id = profile
            .availability
            .get(index)
            .map(|s| s.id)
            .ok_or(AvailabilityError::IndexOutOfBounds(index))?;

        Self::validate_slot_date(&slot)?;
        if profile
            .availability
            .iter()
            .any(|s| s.id != slot_id && s.slot.overlaps(&slot))
        {
            return Err(AvailabilityError::Overlap);
        }

        let replacement = AvailabilitySlot { id: slot_id, slot };
        self.store
            .providers
            .update(provider_id, |p| {
                if let Some(existing) = p.availability.iter_mut().find(|s| s.id == slot_id) {
                    *existing = replacement.clone();
                    p.updated_at = Utc::now();
                }
            })
            .await
            .map_err(|e| AvailabilityError::Storage(e.to_string()))?;

        info!("Provider {} updated availability slot {}", provider_id, slot_id);
        Ok(replacement)
    }

    /// Date-only check: today is fine, yesterday is not.
    fn validate_slot_date(slot: &TimeSlot) -> Result<(), AvailabilityError> {
        if slot.date < Utc::now().date_naive() {
            return Err(AvailabilityError::PastDate);
        }
        Ok(())
    }
}
