use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::notification::{NotificationKind, Reminder};
use shared_store::Datastore;

use notification_cell::NotificationService;

/// Durable reminders with a poll-based sweep. Rows are written at
/// confirmation time and dispatched when due; a process restart loses
/// nothing because the rows live in the store, not in a timer wheel.
///
/// There is no cancel handle: the status re-check at dispatch time is
/// the only safeguard against a reminder outliving its appointment.
pub struct ReminderService {
    store: Arc<Datastore>,
    notifications: NotificationService,
}

impl ReminderService {
    pub fn new(store: Arc<Datastore>) -> Self {
        let notifications = NotificationService::new(Arc::clone(&store));
        Self {
            store,
            notifications,
        }
    }

    /// Queue a reminder for `lead_minutes` before the appointment start.
    /// Too late to remind (due time already passed) is a no-op.
    pub async fn schedule(&self, appointment: &Appointment, lead_minutes: i64) -> Option<Reminder> {
        let due_at = appointment.starts_at() - ChronoDuration::minutes(lead_minutes);

        if due_at <= Utc::now() {
            debug!(
                "Skipping reminder for appointment {}: due time {} already passed",
                appointment.id, due_at
            );
            return None;
        }

        let reminder = Reminder {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            user_id: appointment.requester_id,
            due_at,
            sent: false,
            created_at: Utc::now(),
        };

        self.store
            .reminders
            .insert(reminder.id, reminder.clone())
            .await;

        info!(
            "Scheduled reminder {} for appointment {} at {}",
            reminder.id, appointment.id, due_at
        );
        Some(reminder)
    }

    /// Dispatch every unsent reminder that is due at `now`. The
    /// appointment is re-read at fire time: only a still-confirmed one
    /// produces a notification; anything else is swallowed silently.
    /// Returns the number of reminders that produced a notification.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let due = self
            .store
            .reminders
            .find(|r| !r.sent && r.due_at <= now)
            .await;

        let mut dispatched = 0;
        for reminder in due {
            let appointment = self.store.appointments.get(reminder.appointment_id).await;

            match appointment {
                Some(appointment) if appointment.status == AppointmentStatus::Confirmed => {
                    self.notifications
                        .notify(
                            reminder.user_id,
                            format!(
                                "Reminder: your appointment starts at {} on {}",
                                appointment.start_time.format("%H:%M"),
                                appointment.date
                            ),
                            NotificationKind::Reminder,
                            Some(appointment.id),
                        )
                        .await;
                    dispatched += 1;
                }
                Some(appointment) => {
                    debug!(
                        "Dropping reminder {}: appointment {} is {}",
                        reminder.id, appointment.id, appointment.status
                    );
                }
                None => {
                    warn!(
                        "Dropping reminder {}: appointment {} no longer exists",
                        reminder.id, reminder.appointment_id
                    );
                }
            }

            // Sent either way; a stale reminder must not fire twice.
            if let Err(e) = self.store.reminders.update(reminder.id, |r| r.sent = true).await {
                warn!("Failed to mark reminder {} sent: {}", reminder.id, e);
            }
        }

        dispatched
    }

    /// Background sweep loop; spawned once from the API binary.
    pub async fn run(self, sweep_period: Duration) {
        let mut ticker = interval(sweep_period);
        info!("Reminder sweep running every {:?}", sweep_period);

        loop {
            ticker.tick().await;
            let dispatched = self.sweep_once(Utc::now()).await;
            if dispatched > 0 {
                info!("Dispatched {} reminder(s)", dispatched);
            }
        }
    }
}
