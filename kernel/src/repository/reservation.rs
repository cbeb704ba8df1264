use crate::model::{
    id::{ParkId, ReservationId},
    reservation::{
        event::{CreateReservation, UpdateReservationStatus},
        status::ReservationStatus,
        Reservation, WaitlistedReservation,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

/// Per-hour occupancy read, the unit every admission decision is built from.
#[async_trait]
pub trait OccupancySource: Send {
    /// Sum of party sizes in capacity-holding states covering `hour`.
    async fn occupancy(&mut self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32>;
}

/// A serialised unit of work for one park. Occupancy read through it cannot
/// change until `commit` or drop, so check-then-insert cannot overbook.
/// Dropping without `commit` rolls back.
#[async_trait]
pub trait SlotTransaction: OccupancySource {
    async fn insert(&mut self, event: CreateReservation) -> AppResult<ReservationId>;
    async fn update_status(&mut self, event: UpdateReservationStatus) -> AppResult<bool>;
    // Physically removes a reservation still in `expected` status (discard and rebook)
    async fn delete(
        &mut self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
    ) -> AppResult<bool>;
    async fn commit(&mut self) -> AppResult<()>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // Opens a transaction that serialises capacity decisions for the park
    async fn begin_slot(&self, park_id: ParkId) -> AppResult<Box<dyn SlotTransaction>>;
    // Unlocked occupancy read for a single hour
    async fn occupancy(&self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32>;
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    // Single-row compare-and-set; false when the stored status is no longer `from`
    async fn update_status(&self, event: UpdateReservationStatus) -> AppResult<bool>;
    // InWaitlist reservations entering at exactly `hour`, earliest enrollment first
    async fn list_waitlist(
        &self,
        park_id: ParkId,
        hour: DateTime<Utc>,
    ) -> AppResult<Vec<WaitlistedReservation>>;
    // WaitNotify reservations with after < entry_time <= until
    async fn list_pending_notification(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>>;
    // Notified reservations with entry_time <= entry_until and status_changed_at <= notified_before
    async fn list_expired_notified(
        &self,
        entry_until: DateTime<Utc>,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>>;
    // NotifiedWaitlisted reservations with status_changed_at <= notified_before
    async fn list_expired_waitlist_notifications(
        &self,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>>;
    // InWaitlist / NotifiedWaitlisted reservations whose entry_time <= now
    async fn list_expired_waitlist(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
    // WaitNotify / Confirmed reservations whose exit_time <= now
    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}

/// Reads occupancy straight from the repository, without a slot lock.
pub struct Snapshot<'a>(pub &'a dyn ReservationRepository);

#[async_trait]
impl<'a> OccupancySource for Snapshot<'a> {
    async fn occupancy(&mut self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32> {
        self.0.occupancy(park_id, hour).await
    }
}
