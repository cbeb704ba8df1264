//! In-process store backing the service tests. Implements the same
//! persistence contract as the PostgreSQL adapter, including slot
//! serialisation: a slot transaction holds the store lock until it commits or
//! is dropped.

use crate::{
    model::{
        id::{ParkId, ReservationId},
        park::Park,
        reservation::{
            event::{CreateReservation, UpdateReservationStatus},
            status::ReservationStatus,
            Reservation, WaitlistedReservation,
        },
    },
    repository::{
        park::ParkRepository,
        reservation::{OccupancySource, ReservationRepository, SlotTransaction},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct State {
    parks: BTreeMap<ParkId, Park>,
    reservations: BTreeMap<ReservationId, Reservation>,
    waitlist: BTreeMap<ReservationId, DateTime<Utc>>,
}

impl State {
    fn occupancy(&self, park_id: ParkId, hour: DateTime<Utc>) -> i32 {
        self.reservations
            .values()
            .filter(|r| r.park_id == park_id && r.status.holds_capacity() && r.window().covers(hour))
            .map(|r| r.party_size)
            .sum()
    }

    fn insert(&mut self, event: CreateReservation) -> ReservationId {
        let reservation_id = ReservationId::new();
        if event.status == ReservationStatus::InWaitlist {
            self.waitlist.insert(reservation_id, event.created_at);
        }
        self.reservations.insert(
            reservation_id,
            Reservation {
                reservation_id,
                park_id: event.park_id,
                visitor: event.visitor,
                visitor_type: event.visitor_type,
                party_size: event.party_size,
                entry_time: event.window.entry,
                exit_time: event.window.exit,
                price: event.price,
                paid: event.paid,
                status: event.status,
                status_changed_at: event.created_at,
                created_at: event.created_at,
            },
        );
        reservation_id
    }

    fn update_status(&mut self, event: UpdateReservationStatus) -> bool {
        match self.reservations.get_mut(&event.reservation_id) {
            Some(r) if r.status == event.from => {
                r.status = event.to;
                r.status_changed_at = event.changed_at;
                true
            }
            _ => false,
        }
    }

    fn delete(&mut self, reservation_id: ReservationId, expected: ReservationStatus) -> bool {
        match self.reservations.get(&reservation_id) {
            Some(r) if r.status == expected => {
                self.reservations.remove(&reservation_id);
                self.waitlist.remove(&reservation_id);
                true
            }
            _ => false,
        }
    }

    fn select(&self, predicate: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut rows: Vec<_> = self
            .reservations
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.entry_time, r.created_at));
        rows
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_park(&self, park: Park) {
        self.state.lock().await.parks.insert(park.park_id, park);
    }

    pub async fn park(&self, park_id: ParkId) -> Option<Park> {
        self.state.lock().await.parks.get(&park_id).cloned()
    }

    /// Stores a reservation as-is. `enrolled_at` adds a waitlist entry.
    pub async fn seed(&self, reservation: Reservation, enrolled_at: Option<DateTime<Utc>>) {
        let mut state = self.state.lock().await;
        if let Some(enrolled_at) = enrolled_at {
            state.waitlist.insert(reservation.reservation_id, enrolled_at);
        }
        state
            .reservations
            .insert(reservation.reservation_id, reservation);
    }

    pub async fn reservation(&self, reservation_id: ReservationId) -> Option<Reservation> {
        self.state
            .lock()
            .await
            .reservations
            .get(&reservation_id)
            .cloned()
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().await.select(|_| true)
    }

    /// While set, every operation fails with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        ensure_available(&self.failing)
    }
}

fn ensure_available(failing: &AtomicBool) -> AppResult<()> {
    if failing.load(Ordering::SeqCst) {
        return Err(AppError::SpecificOperationError(sqlx::Error::PoolTimedOut));
    }
    Ok(())
}

#[async_trait]
impl ParkRepository for InMemoryStore {
    async fn find_by_id(&self, park_id: ParkId) -> AppResult<Option<Park>> {
        self.check()?;
        Ok(self.state.lock().await.parks.get(&park_id).cloned())
    }

    async fn adjust_current_visitors(&self, park_id: ParkId, delta: i32) -> AppResult<()> {
        self.check()?;
        let mut state = self.state.lock().await;
        let park = state
            .parks
            .get_mut(&park_id)
            .ok_or_else(|| AppError::EntityNotFound(format!("park {park_id} not found")))?;
        park.current_visitors = (park.current_visitors + delta).max(0);
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn begin_slot(&self, _park_id: ParkId) -> AppResult<Box<dyn SlotTransaction>> {
        self.check()?;
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(MemorySlot {
            guard: Some(guard),
            staged,
            failing: self.failing.clone(),
        }))
    }

    async fn occupancy(&self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32> {
        self.check()?;
        Ok(self.state.lock().await.occupancy(park_id, hour))
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        self.check()?;
        Ok(self.reservation(reservation_id).await)
    }

    async fn update_status(&self, event: UpdateReservationStatus) -> AppResult<bool> {
        self.check()?;
        Ok(self.state.lock().await.update_status(event))
    }

    async fn list_waitlist(
        &self,
        park_id: ParkId,
        hour: DateTime<Utc>,
    ) -> AppResult<Vec<WaitlistedReservation>> {
        self.check()?;
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .reservations
            .values()
            .filter(|r| {
                r.park_id == park_id
                    && r.entry_time == hour
                    && r.status == ReservationStatus::InWaitlist
            })
            .filter_map(|r| {
                state.waitlist.get(&r.reservation_id).map(|enrolled_at| WaitlistedReservation {
                    reservation: r.clone(),
                    enrolled_at: *enrolled_at,
                })
            })
            .collect();
        rows.sort_by_key(|w| w.enrolled_at);
        Ok(rows)
    }

    async fn list_pending_notification(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        self.check()?;
        Ok(self.state.lock().await.select(|r| {
            r.status == ReservationStatus::WaitNotify && after < r.entry_time && r.entry_time <= until
        }))
    }

    async fn list_expired_notified(
        &self,
        entry_until: DateTime<Utc>,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        self.check()?;
        Ok(self.state.lock().await.select(|r| {
            r.status == ReservationStatus::Notified
                && r.entry_time <= entry_until
                && r.status_changed_at <= notified_before
        }))
    }

    async fn list_expired_waitlist_notifications(
        &self,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        self.check()?;
        Ok(self.state.lock().await.select(|r| {
            r.status == ReservationStatus::NotifiedWaitlisted && r.status_changed_at <= notified_before
        }))
    }

    async fn list_expired_waitlist(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .await
            .select(|r| r.status.is_waitlisted() && r.entry_time <= now))
    }

    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        self.check()?;
        Ok(self.state.lock().await.select(|r| {
            matches!(
                r.status,
                ReservationStatus::WaitNotify | ReservationStatus::Confirmed
            ) && r.exit_time <= now
        }))
    }
}

struct MemorySlot {
    guard: Option<OwnedMutexGuard<State>>,
    staged: State,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl OccupancySource for MemorySlot {
    async fn occupancy(&mut self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32> {
        ensure_available(&self.failing)?;
        Ok(self.staged.occupancy(park_id, hour))
    }
}

#[async_trait]
impl SlotTransaction for MemorySlot {
    async fn insert(&mut self, event: CreateReservation) -> AppResult<ReservationId> {
        ensure_available(&self.failing)?;
        Ok(self.staged.insert(event))
    }

    async fn update_status(&mut self, event: UpdateReservationStatus) -> AppResult<bool> {
        ensure_available(&self.failing)?;
        Ok(self.staged.update_status(event))
    }

    async fn delete(
        &mut self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
    ) -> AppResult<bool> {
        ensure_available(&self.failing)?;
        Ok(self.staged.delete(reservation_id, expected))
    }

    async fn commit(&mut self) -> AppResult<()> {
        ensure_available(&self.failing)?;
        let mut guard = self.guard.take().ok_or_else(|| {
            AppError::StateConflict("slot transaction has already been committed".into())
        })?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
