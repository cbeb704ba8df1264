use crate::{
    model::{
        id::ReservationId,
        reservation::{
            event::UpdateReservationStatus,
            status::{ReservationStatus, StatusTransition},
            Reservation,
        },
    },
    repository::{park::ParkRepository, reservation::ReservationRepository},
    service::waitlist::WaitlistPromoter,
};
use chrono::{DateTime, Utc};
use derive_new::new;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

#[derive(new, Clone)]
pub struct LifecycleService {
    parks: Arc<dyn ParkRepository>,
    reservations: Arc<dyn ReservationRepository>,
    promoter: WaitlistPromoter,
}

impl LifecycleService {
    pub async fn find(&self, reservation_id: ReservationId) -> AppResult<Reservation> {
        self.reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("reservation ({reservation_id}) was not found"))
            })
    }

    pub async fn confirm(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        self.transition(reservation_id, StatusTransition::Confirm, now)
            .await
    }

    /// Cancels the reservation and hands any capacity it held to the waitlist.
    /// A failed promotion is logged; the cancellation itself stands.
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let before = self.find(reservation_id).await?;
        let after = self
            .apply(before.clone(), StatusTransition::Cancel, now)
            .await?;
        if before.status.holds_capacity() {
            if let Err(e) = self.promoter.promote_vacated(&before, now).await {
                tracing::warn!(
                    %reservation_id,
                    error.cause_chain = ?e,
                    error.message = %e,
                    "waitlist promotion after cancellation failed"
                );
            }
        }
        Ok(after)
    }

    pub async fn check_in(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = self
            .transition(reservation_id, StatusTransition::CheckIn, now)
            .await?;
        self.track_visitors(&reservation, reservation.party_size)
            .await;
        Ok(reservation)
    }

    pub async fn check_out(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = self
            .transition(reservation_id, StatusTransition::CheckOut, now)
            .await?;
        self.track_visitors(&reservation, -reservation.party_size)
            .await;
        Ok(reservation)
    }

    // The status change has already committed; a counter failure only skews
    // the live head count and is not reported to the caller.
    async fn track_visitors(&self, reservation: &Reservation, delta: i32) {
        if let Err(e) = self
            .parks
            .adjust_current_visitors(reservation.park_id, delta)
            .await
        {
            tracing::warn!(
                reservation_id = %reservation.reservation_id,
                park_id = %reservation.park_id,
                delta,
                error.cause_chain = ?e,
                error.message = %e,
                "failed to update the visitor count"
            );
        }
    }

    async fn transition(
        &self,
        reservation_id: ReservationId,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = self.find(reservation_id).await?;
        self.apply(reservation, transition, now).await
    }

    async fn apply(
        &self,
        reservation: Reservation,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        match apply_transition(self.reservations.as_ref(), &reservation, transition, now).await? {
            Some(status) => {
                tracing::info!(
                    reservation_id = %reservation.reservation_id,
                    from = %reservation.status,
                    to = %status,
                    "reservation status changed"
                );
                Ok(Reservation {
                    status,
                    status_changed_at: now,
                    ..reservation
                })
            }
            None => Err(AppError::StateConflict(format!(
                "reservation ({}) was modified concurrently",
                reservation.reservation_id
            ))),
        }
    }
}

/// Computes the next status and writes it with a compare-and-set. `None` means
/// the stored status moved on after `reservation` was read.
pub(crate) async fn apply_transition(
    reservations: &dyn ReservationRepository,
    reservation: &Reservation,
    transition: StatusTransition,
    now: DateTime<Utc>,
) -> AppResult<Option<ReservationStatus>> {
    let next = reservation.status.apply(transition)?;
    let updated = reservations
        .update_status(UpdateReservationStatus::new(
            reservation.reservation_id,
            reservation.status,
            next,
            now,
        ))
        .await?;
    Ok(updated.then_some(next))
}
