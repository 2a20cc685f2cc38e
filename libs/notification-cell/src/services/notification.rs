use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::notification::{Notification, NotificationKind};
use shared_store::Datastore;

use crate::models::NotificationError;

/// In-app notification records. Emission is fire-and-forget from the
/// caller's point of view; delivery beyond the store (email, push) is an
/// external collaborator.
pub struct NotificationService {
    store: Arc<Datastore>,
}

impl NotificationService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        message: impl Into<String>,
        kind: NotificationKind,
        appointment_id: Option<Uuid>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            message: message.into(),
            kind,
            appointment_id,
            read: false,
            created_at: Utc::now(),
        };

        self.store
            .notifications
            .insert(notification.id, notification.clone())
            .await;

        info!(
            "Notified user {} ({}): {}",
            user_id, kind, notification.message
        );
        notification
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Vec<Notification> {
        let mut notifications = self
            .store
            .notifications
            .find(|n| n.user_id == user_id)
            .await;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    pub async fn unread_count(&self, user_id: Uuid) -> usize {
        self.store
            .notifications
            .find(|n| n.user_id == user_id && !n.read)
            .await
            .len()
    }

    /// Only the recipient may flip read state.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .store
            .notifications
            .get(notification_id)
            .await
            .ok_or(NotificationError::NotFound(notification_id))?;

        if notification.user_id != caller_id {
            return Err(NotificationError::Forbidden(notification_id));
        }

        debug!("Marking notification {} read", notification_id);
        self.store
            .notifications
            .update(notification_id, |n| n.read = true)
            .await
            .map_err(|_| NotificationError::NotFound(notification_id))
    }
}
