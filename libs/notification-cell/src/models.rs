use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification {0} not found")]
    NotFound(Uuid),

    #[error("Notification {0} belongs to another user")]
    Forbidden(Uuid),
}
