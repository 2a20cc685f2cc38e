use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::accounts::{AvailabilitySlot, Role};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::interval::TimeSlot;
use shared_models::notification::NotificationKind;
use shared_store::Datastore;

use notification_cell::NotificationService;
use provider_cell::find_covering_slot;

use crate::models::BookingError;

/// Reserves a requested interval out of a provider's open slots: the
/// covering slot is removed and its remainders re-appended, the
/// appointment is written as `pending`, and the provider is notified.
pub struct BookingService {
    store: Arc<Datastore>,
    notifications: NotificationService,
}

impl BookingService {
    pub fn new(store: Arc<Datastore>) -> Self {
        let notifications = NotificationService::new(Arc::clone(&store));
        Self {
            store,
            notifications,
        }
    }

    pub async fn book_appointment(
        &self,
        provider_id: Uuid,
        requester_id: Uuid,
        requested: TimeSlot,
    ) -> Result<Appointment, BookingError> {
        debug!(
            "Booking request: provider {} requester {} {} {}-{}",
            provider_id, requester_id, requested.date, requested.start_time, requested.end_time
        );

        // Step 1: the requester must exist and hold the requester role.
        let requester = self
            .store
            .users
            .get(requester_id)
            .await
            .ok_or(BookingError::RequesterNotFound)?;
        if requester.role != Role::Requester {
            return Err(BookingError::Forbidden);
        }

        // Step 2: same for the provider, which also needs a profile.
        let provider_account = self
            .store
            .users
            .get(provider_id)
            .await
            .ok_or(BookingError::ProviderNotFound)?;
        if provider_account.role != Role::Provider {
            return Err(BookingError::Forbidden);
        }

        // Steps 3-5 run under the provider lock: the duplicate check and
        // the covering-slot read must not interleave with another booking
        // or an availability mutation against the same provider.
        let lock = self.store.provider_lock(provider_id).await;
        let _guard = lock.lock().await;

        let profile = self
            .store
            .providers
            .get(provider_id)
            .await
            .ok_or(BookingError::ProviderNotFound)?;

        let duplicate = self
            .store
            .appointments
            .find_one(|a| a.provider_id == provider_id && a.slot() == requested)
            .await;
        if duplicate.is_some() {
            return Err(BookingError::AlreadyBooked);
        }

        // The request must fit inside a single open slot; partial overlap
        // across slots is never stitched together.
        let index = find_covering_slot(&profile.availability, &requested)
            .ok_or(BookingError::SlotNotAvailable)?;
        let covering = profile.availability[index].clone();
        let remainders = covering.slot.subtract(&requested);

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id,
            requester_id,
            date: requested.date,
            start_time: requested.start_time,
            end_time: requested.end_time,
            status: AppointmentStatus::Pending,
            session_token: None,
            created_at: now,
            updated_at: now,
        };
        self.store
            .appointments
            .insert(appointment.id, appointment.clone())
            .await;

        // Consume the covering slot, left remainder before right. If the
        // profile write fails the appointment is rolled back so neither
        // write is observable alone.
        let covering_id = covering.id;
        if let Err(e) = self
            .store
            .providers
            .update(provider_id, |p| {
                if let Some(pos) = p.availability.iter().position(|s| s.id == covering_id) {
                    p.availability.remove(pos);
                }
                for remainder in &remainders {
                    p.availability.push(AvailabilitySlot::new(*remainder));
                }
                p.updated_at = now;
            })
            .await
        {
            warn!(
                "Availability update failed for provider {}; rolling back appointment {}",
                provider_id, appointment.id
            );
            self.store.appointments.remove(appointment.id).await;
            return Err(BookingError::Storage(e.to_string()));
        }

        drop(_guard);

        self.notifications
            .notify(
                provider_id,
                format!(
                    "New appointment requested by {} on {} from {} to {}",
                    requester.display_name,
                    requested.date,
                    requested.start_time.format("%H:%M"),
                    requested.end_time.format("%H:%M"),
                ),
                NotificationKind::Booking,
                Some(appointment.id),
            )
            .await;

        info!(
            "Appointment {} booked with provider {} ({} remainder slot(s))",
            appointment.id,
            provider_id,
            remainders.len()
        );
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .appointments
            .get(appointment_id)
            .await
            .ok_or(BookingError::AppointmentNotFound)
    }

    /// Requesters and providers see their own appointments, admins all,
    /// ordered by start.
    pub async fn list_for_user(&self, caller_id: Uuid, caller_role: Role) -> Vec<Appointment> {
        let mut appointments = match caller_role {
            Role::Admin => self.store.appointments.all().await,
            Role::Provider => {
                self.store
                    .appointments
                    .find(|a| a.provider_id == caller_id)
                    .await
            }
            Role::Requester => {
                self.store
                    .appointments
                    .find(|a| a.requester_id == caller_id)
                    .await
            }
        };
        appointments.sort_by_key(|a| (a.date, a.start_time));
        appointments
    }

    /// Plain CRUD deletion: only the original requester or an admin. The
    /// consumed slot is not restored; whether it should be is an open
    /// question upstream and deliberately left alone here.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        caller_role: Role,
    ) -> Result<(), BookingError> {
        let appointment = self.get_appointment(appointment_id).await?;

        let is_owner = appointment.requester_id == caller_id;
        if !is_owner && caller_role != Role::Admin {
            return Err(BookingError::Forbidden);
        }

        self.store.appointments.remove(appointment_id).await;
        info!("Appointment {} deleted by {}", appointment_id, caller_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate};
    use shared_models::accounts::ProviderProfile;
    use shared_models::interval::TimeSlot;
    use shared_utils::test_utils::{seed_account, seed_provider};

    fn test_date() -> NaiveDate {
        (Utc::now() + Duration::days(30)).date_naive()
    }

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot::new(test_date(), start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    async fn add_open_slot(store: &Datastore, provider_id: Uuid, open: TimeSlot) {
        store
            .providers
            .update(provider_id, |p| {
                p.availability.push(AvailabilitySlot::new(open));
            })
            .await
            .unwrap();
    }

    async fn setup() -> (Arc<Datastore>, BookingService, ProviderProfile, Uuid) {
        let store = Arc::new(Datastore::new());
        let provider = seed_provider(&store, "Dr Imani").await;
        let requester = seed_account(&store, Role::Requester, "Sam Student").await;
        let service = BookingService::new(Arc::clone(&store));
        (store, service, provider, requester.id)
    }

    #[tokio::test]
    async fn booking_start_of_slot_keeps_right_remainder() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;

        let appointment = service
            .book_appointment(provider.id, requester_id, slot("09:00:00", "09:30:00"))
            .await
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(appointment.session_token.is_none());

        let availability = store.providers.get(provider.id).await.unwrap().availability;
        assert_eq!(availability.len(), 1);
        assert_eq!(availability[0].slot, slot("09:30:00", "10:00:00"));

        // Provider was told about the request.
        let notifications = store
            .notifications
            .find(|n| n.user_id == provider.id)
            .await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Booking);
        assert_eq!(notifications[0].appointment_id, Some(appointment.id));
    }

    #[tokio::test]
    async fn booking_mid_slot_splits_into_two_remainders() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "12:00:00")).await;

        service
            .book_appointment(provider.id, requester_id, slot("10:00:00", "10:45:00"))
            .await
            .unwrap();

        let availability = store.providers.get(provider.id).await.unwrap().availability;
        let slots: Vec<TimeSlot> = availability.iter().map(|s| s.slot).collect();
        assert_eq!(
            slots,
            vec![slot("09:00:00", "10:00:00"), slot("10:45:00", "12:00:00")]
        );
    }

    #[tokio::test]
    async fn booking_exact_slot_consumes_it_entirely() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;

        service
            .book_appointment(provider.id, requester_id, slot("09:00:00", "10:00:00"))
            .await
            .unwrap();

        let availability = store.providers.get(provider.id).await.unwrap().availability;
        assert!(availability.is_empty());
    }

    #[tokio::test]
    async fn booking_conserves_open_minutes() {
        let (store, service, provider, requester_id) = setup().await;
        let open = slot("09:00:00", "12:00:00");
        add_open_slot(&store, provider.id, open).await;

        let requested = slot("09:40:00", "10:20:00");
        service
            .book_appointment(provider.id, requester_id, requested)
            .await
            .unwrap();

        let availability = store.providers.get(provider.id).await.unwrap().availability;
        let remaining: i64 = availability.iter().map(|s| s.slot.duration_minutes()).sum();
        assert_eq!(
            remaining + requested.duration_minutes(),
            open.duration_minutes()
        );
    }

    #[tokio::test]
    async fn partial_overlap_is_not_coverable() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;
        add_open_slot(&store, provider.id, slot("10:00:00", "11:00:00")).await;

        // Spans both open slots, contained by neither.
        assert_matches!(
            service
                .book_appointment(provider.id, requester_id, slot("09:30:00", "10:30:00"))
                .await,
            Err(BookingError::SlotNotAvailable)
        );

        // No availability was touched and no appointment written.
        let availability = store.providers.get(provider.id).await.unwrap().availability;
        assert_eq!(availability.len(), 2);
        assert!(store.appointments.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_interval_conflicts() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "12:00:00")).await;
        let other_requester = seed_account(&store, Role::Requester, "Ana Other").await;

        service
            .book_appointment(provider.id, requester_id, slot("09:00:00", "09:30:00"))
            .await
            .unwrap();

        assert_matches!(
            service
                .book_appointment(provider.id, other_requester.id, slot("09:00:00", "09:30:00"))
                .await,
            Err(BookingError::AlreadyBooked)
        );
    }

    #[tokio::test]
    async fn role_and_existence_checks() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;

        assert_matches!(
            service
                .book_appointment(provider.id, Uuid::new_v4(), slot("09:00:00", "09:30:00"))
                .await,
            Err(BookingError::RequesterNotFound)
        );

        assert_matches!(
            service
                .book_appointment(Uuid::new_v4(), requester_id, slot("09:00:00", "09:30:00"))
                .await,
            Err(BookingError::ProviderNotFound)
        );

        // A provider cannot book as the requester.
        let other_provider = seed_provider(&store, "Dr Asare").await;
        assert_matches!(
            service
                .book_appointment(provider.id, other_provider.id, slot("09:00:00", "09:30:00"))
                .await,
            Err(BookingError::Forbidden)
        );

        // A requester on the provider side is equally rejected.
        assert_matches!(
            service
                .book_appointment(requester_id, requester_id, slot("09:00:00", "09:30:00"))
                .await,
            Err(BookingError::Forbidden)
        );
    }

    #[tokio::test]
    async fn concurrent_identical_bookings_admit_exactly_one() {
        let (store, _, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;
        let second_requester = seed_account(&store, Role::Requester, "Ana Other").await;

        let requested = slot("09:00:00", "09:30:00");
        let first = {
            let store = Arc::clone(&store);
            let provider_id = provider.id;
            tokio::spawn(async move {
                BookingService::new(store)
                    .book_appointment(provider_id, requester_id, requested)
                    .await
            })
        };
        let second = {
            let store = Arc::clone(&store);
            let provider_id = provider.id;
            let requester_id = second_requester.id;
            tokio::spawn(async move {
                BookingService::new(store)
                    .book_appointment(provider_id, requester_id, requested)
                    .await
            })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(BookingError::AlreadyBooked) | Err(BookingError::SlotNotAvailable)
        )));

        // The winner consumed the slot once: one appointment, one remainder.
        assert_eq!(store.appointments.len().await, 1);
        let availability = store.providers.get(provider.id).await.unwrap().availability;
        assert_eq!(availability.len(), 1);
        assert_eq!(availability[0].slot, slot("09:30:00", "10:00:00"));
    }

    #[tokio::test]
    async fn deletion_is_owner_or_admin_only() {
        let (store, service, provider, requester_id) = setup().await;
        add_open_slot(&store, provider.id, slot("09:00:00", "10:00:00")).await;
        let admin = seed_account(&store, Role::Admin, "Root Admin").await;

        let appointment = service
            .book_appointment(provider.id, requester_id, slot("09:00:00", "09:30:00"))
            .await
            .unwrap();

        assert_matches!(
            service
                .delete_appointment(appointment.id, provider.id, Role::Provider)
                .await,
            Err(BookingError::Forbidden)
        );

        service
            .delete_appointment(appointment.id, admin.id, Role::Admin)
            .await
            .unwrap();
        assert_matches!(
            service.get_appointment(appointment.id).await,
            Err(BookingError::AppointmentNotFound)
        );
    }
}
