use crate::model::{id::ReservationId, notification::Notification};
use async_trait::async_trait;

/// Fire-and-forget delivery. Failures are the implementation's to log; the
/// caller never retries.
#[mockall::automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, reservation_id: ReservationId, notification: Notification);
}
