use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::accounts::Role;
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::notification::NotificationKind;
use shared_store::Datastore;

use notification_cell::NotificationService;
use reminder_cell::ReminderService;

use crate::models::BookingError;

const SESSION_TOKEN_LEN: usize = 32;

/// Owns the appointment lifecycle:
/// `pending -> confirmed | canceled`, `confirmed -> completed | canceled`,
/// with `canceled` and `completed` terminal. Confirmation mints the
/// shared session token and queues the pre-start reminder.
pub struct LifecycleService {
    store: Arc<Datastore>,
    notifications: NotificationService,
    reminders: ReminderService,
    reminder_lead_minutes: i64,
}

impl LifecycleService {
    pub fn new(store: Arc<Datastore>, reminder_lead_minutes: i64) -> Self {
        let notifications = NotificationService::new(Arc::clone(&store));
        let reminders = ReminderService::new(Arc::clone(&store));
        Self {
            store,
            notifications,
            reminders,
            reminder_lead_minutes,
        }
    }

    pub fn valid_transitions(status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match status {
            AppointmentStatus::Pending => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Canceled]
            }
            AppointmentStatus::Confirmed => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Canceled]
            }
            // Terminal states
            AppointmentStatus::Canceled | AppointmentStatus::Completed => vec![],
        }
    }

    pub fn validate_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), BookingError> {
        if !Self::valid_transitions(from).contains(&to) {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            return Err(BookingError::InvalidTransition { from, to });
        }
        debug!("Status transition validated: {} -> {}", from, to);
        Ok(())
    }

    /// Providers act on their own appointments, admins on any. A
    /// provider probing someone else's appointment sees plain absence.
    pub async fn set_status(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        caller_role: Role,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        if !matches!(caller_role, Role::Provider | Role::Admin) {
            return Err(BookingError::Forbidden);
        }

        let appointment = self
            .store
            .appointments
            .get(appointment_id)
            .await
            .ok_or(BookingError::AppointmentNotFound)?;

        if caller_role == Role::Provider && appointment.provider_id != caller_id {
            return Err(BookingError::AppointmentNotFound);
        }

        Self::validate_transition(appointment.status, new_status)?;

        let session_token = if new_status == AppointmentStatus::Confirmed {
            Some(generate_session_token())
        } else {
            None
        };

        let updated = self
            .store
            .appointments
            .update(appointment_id, |a| {
                a.status = new_status;
                if let Some(token) = session_token {
                    a.session_token = Some(token);
                }
                a.updated_at = Utc::now();
            })
            .await
            .map_err(|e| BookingError::Storage(e.to_string()))?;

        self.notifications
            .notify(
                updated.requester_id,
                format!(
                    "Your appointment on {} at {} is now {}",
                    updated.date,
                    updated.start_time.format("%H:%M"),
                    updated.status
                ),
                NotificationKind::Status,
                Some(updated.id),
            )
            .await;

        if new_status == AppointmentStatus::Confirmed {
            self.reminders
                .schedule(&updated, self.reminder_lead_minutes)
                .await;
            // Email delivery of the session link is an external
            // collaborator; hand off here.
            info!(
                "Appointment {} confirmed; session link goes out to requester {} and provider {}",
                updated.id, updated.requester_id, updated.provider_id
            );
        }

        info!("Appointment {} is now {}", updated.id, updated.status);
        Ok(updated)
    }
}

fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveTime};
    use shared_utils::test_utils::{seed_account, seed_provider};

    async fn seed_appointment(
        store: &Arc<Datastore>,
        provider_id: Uuid,
        requester_id: Uuid,
        status: AppointmentStatus,
    ) -> Appointment {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id,
            requester_id,
            date: (now + Duration::days(30)).date_naive(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            status,
            session_token: None,
            created_at: now,
            updated_at: now,
        };
        store
            .appointments
            .insert(appointment.id, appointment.clone())
            .await;
        appointment
    }

    async fn setup(status: AppointmentStatus) -> (Arc<Datastore>, LifecycleService, Appointment) {
        let store = Arc::new(Datastore::new());
        let provider = seed_provider(&store, "Dr Imani").await;
        let requester = seed_account(&store, Role::Requester, "Sam Student").await;
        let appointment = seed_appointment(&store, provider.id, requester.id, status).await;
        let service = LifecycleService::new(Arc::clone(&store), 5);
        (store, service, appointment)
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use AppointmentStatus::*;

        assert!(LifecycleService::validate_transition(Pending, Confirmed).is_ok());
        assert!(LifecycleService::validate_transition(Pending, Canceled).is_ok());
        assert!(LifecycleService::validate_transition(Confirmed, Completed).is_ok());
        assert!(LifecycleService::validate_transition(Confirmed, Canceled).is_ok());

        assert_matches!(
            LifecycleService::validate_transition(Pending, Completed),
            Err(BookingError::InvalidTransition { .. })
        );
        for terminal in [Completed, Canceled] {
            for next in [Pending, Confirmed, Canceled, Completed] {
                assert_matches!(
                    LifecycleService::validate_transition(terminal, next),
                    Err(BookingError::InvalidTransition { .. })
                );
            }
        }
    }

    #[tokio::test]
    async fn confirming_notifies_mints_token_and_schedules_reminder() {
        let (store, service, appointment) = setup(AppointmentStatus::Pending).await;

        let updated = service
            .set_status(
                appointment.id,
                appointment.provider_id,
                Role::Provider,
                AppointmentStatus::Confirmed,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Confirmed);
        let token = updated
            .session_token
            .clone()
            .expect("confirmation mints a token");
        assert_eq!(token.len(), SESSION_TOKEN_LEN);

        let notifications = store
            .notifications
            .find(|n| n.user_id == appointment.requester_id)
            .await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Status);

        let reminders = store
            .reminders
            .find(|r| r.appointment_id == appointment.id)
            .await;
        assert_eq!(reminders.len(), 1);
        assert_eq!(
            reminders[0].due_at,
            updated.starts_at() - Duration::minutes(5)
        );
    }

    #[tokio::test]
    async fn canceling_does_not_schedule_a_reminder() {
        let (store, service, appointment) = setup(AppointmentStatus::Pending).await;

        let updated = service
            .set_status(
                appointment.id,
                appointment.provider_id,
                Role::Provider,
                AppointmentStatus::Canceled,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Canceled);
        assert!(updated.session_token.is_none());
        assert!(store.reminders.is_empty().await);
    }

    #[tokio::test]
    async fn requester_cannot_drive_the_lifecycle() {
        let (_, service, appointment) = setup(AppointmentStatus::Pending).await;

        assert_matches!(
            service
                .set_status(
                    appointment.id,
                    appointment.requester_id,
                    Role::Requester,
                    AppointmentStatus::Confirmed,
                )
                .await,
            Err(BookingError::Forbidden)
        );
    }

    #[tokio::test]
    async fn foreign_provider_sees_absence_not_forbidden() {
        let (store, service, appointment) = setup(AppointmentStatus::Pending).await;
        let other_provider = seed_provider(&store, "Dr Asare").await;

        assert_matches!(
            service
                .set_status(
                    appointment.id,
                    other_provider.id,
                    Role::Provider,
                    AppointmentStatus::Confirmed,
                )
                .await,
            Err(BookingError::AppointmentNotFound)
        );
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_and_leaves_state_alone() {
        let (store, service, appointment) = setup(AppointmentStatus::Pending).await;

        assert_matches!(
            service
                .set_status(
                    appointment.id,
                    appointment.provider_id,
                    Role::Provider,
                    AppointmentStatus::Completed,
                )
                .await,
            Err(BookingError::InvalidTransition { .. })
        );

        let unchanged = store.appointments.get(appointment.id).await.unwrap();
        assert_eq!(unchanged.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn admin_may_complete_a_confirmed_appointment() {
        let (store, service, appointment) = setup(AppointmentStatus::Confirmed).await;
        let admin = seed_account(&store, Role::Admin, "Root Admin").await;

        let updated = service
            .set_status(
                appointment.id,
                admin.id,
                Role::Admin,
                AppointmentStatus::Completed,
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Completed);
    }
}
