use crate::{
    model::{
        id::{ParkId, ReservationId},
        notification::Notification,
        park::Park,
        reservation::{event::UpdateReservationStatus, status::StatusTransition, Reservation},
    },
    notifier::Notifier,
    repository::{park::ParkRepository, reservation::ReservationRepository},
    service::{
        find_park,
        occupancy::{check_window, WindowCheck},
    },
};
use chrono::{DateTime, Utc};
use derive_new::new;
use shared::error::AppResult;
use std::sync::Arc;

#[derive(new, Clone)]
pub struct WaitlistPromoter {
    parks: Arc<dyn ParkRepository>,
    reservations: Arc<dyn ReservationRepository>,
    notifier: Arc<dyn Notifier>,
}

impl WaitlistPromoter {
    /// Promotes waitlisted reservations for `park_id` entering at `hour`, in
    /// enrollment order. A candidate that no longer fits is skipped and the scan
    /// moves on. Each promotion commits on its own; an error stops the pass but
    /// keeps promotions already made. Hours at or before `now` promote nobody.
    pub async fn promote(
        &self,
        park_id: ParkId,
        hour: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationId>> {
        if hour <= now {
            return Ok(Vec::new());
        }
        let candidates = self.reservations.list_waitlist(park_id, hour).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let park = find_park(self.parks.as_ref(), park_id).await?;

        let mut promoted = Vec::new();
        for candidate in candidates {
            let reservation = candidate.reservation;
            if reservation.entry_time <= now {
                continue;
            }
            if self.try_promote(&park, &reservation, now).await? {
                tracing::info!(
                    reservation_id = %reservation.reservation_id,
                    park_id = %park_id,
                    %hour,
                    enrolled_at = %candidate.enrolled_at,
                    "waitlisted reservation promoted"
                );
                self.notifier
                    .notify(
                        reservation.reservation_id,
                        Notification::waitlist_promotion(&reservation),
                    )
                    .await;
                promoted.push(reservation.reservation_id);
            } else {
                tracing::debug!(
                    reservation_id = %reservation.reservation_id,
                    party_size = reservation.party_size,
                    "waitlisted reservation does not fit yet"
                );
            }
        }
        Ok(promoted)
    }

    /// Runs `promote` for every hour a released reservation used to occupy
    /// that is still ahead of `now`.
    pub async fn promote_vacated(
        &self,
        released: &Reservation,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationId>> {
        let mut promoted = Vec::new();
        for hour in released.window().hours().filter(|hour| *hour > now) {
            promoted.extend(self.promote(released.park_id, hour, now).await?);
        }
        Ok(promoted)
    }

    async fn try_promote(
        &self,
        park: &Park,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let next = reservation.status.apply(StatusTransition::Promote)?;
        let mut tx = self.reservations.begin_slot(park.park_id).await?;

        let check = check_window(&mut *tx, park, &reservation.window(), reservation.party_size)
            .await?;
        if let WindowCheck::Full { .. } = check {
            return Ok(false);
        }

        let updated = tx
            .update_status(UpdateReservationStatus::new(
                reservation.reservation_id,
                reservation.status,
                next,
                now,
            ))
            .await?;
        if !updated {
            // Cancelled or promoted by someone else since the list was read.
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::reservation::status::ReservationStatus,
        notifier::MockNotifier,
        repository::memory::InMemoryStore,
        service::fixture::{at, park, reservation},
    };

    fn promoter(store: &InMemoryStore, notifier: MockNotifier) -> WaitlistPromoter {
        WaitlistPromoter::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier),
        )
    }

    fn quiet_notifier(times: usize) -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(times).return_const(());
        notifier
    }

    #[tokio::test]
    async fn promotes_in_enrollment_order_and_skips_what_does_not_fit() {
        let store = InMemoryStore::new();
        let park = park(100, 20, 2);
        store.add_park(park.clone()).await;
        store.seed(reservation(&park, 10, 70, ReservationStatus::Confirmed), None).await;

        let first = reservation(&park, 10, 6, ReservationStatus::InWaitlist);
        let too_big = reservation(&park, 10, 5, ReservationStatus::InWaitlist);
        let small = reservation(&park, 10, 4, ReservationStatus::InWaitlist);
        let late = reservation(&park, 10, 1, ReservationStatus::InWaitlist);
        // Seeded out of order on purpose; enrollment time decides.
        store.seed(late.clone(), Some(at(4))).await;
        store.seed(small.clone(), Some(at(3))).await;
        store.seed(first.clone(), Some(at(1))).await;
        store.seed(too_big.clone(), Some(at(2))).await;

        let promoted = promoter(&store, quiet_notifier(2))
            .promote(park.park_id, at(10), at(5))
            .await
            .unwrap();

        // 70 + 6 = 76; 76 + 5 > 80 is skipped; 76 + 4 = 80; then full.
        assert_eq!(promoted, vec![first.reservation_id, small.reservation_id]);
        let promoted_row = store.reservation(first.reservation_id).await.unwrap();
        assert_eq!(promoted_row.status, ReservationStatus::NotifiedWaitlisted);
        assert_eq!(promoted_row.status_changed_at, at(5));
        for skipped in [too_big.reservation_id, late.reservation_id] {
            assert_eq!(
                store.reservation(skipped).await.unwrap().status,
                ReservationStatus::InWaitlist
            );
        }
    }

    #[tokio::test]
    async fn checks_every_hour_of_the_candidate_window() {
        let store = InMemoryStore::new();
        let park = park(10, 0, 3);
        store.add_park(park.clone()).await;
        // Entry hour is free but the third hour is taken.
        store.seed(reservation(&park, 12, 10, ReservationStatus::Confirmed), None).await;
        let candidate = reservation(&park, 10, 2, ReservationStatus::InWaitlist);
        store.seed(candidate.clone(), Some(at(1))).await;

        let promoted = promoter(&store, quiet_notifier(0))
            .promote(park.park_id, at(10), at(5))
            .await
            .unwrap();
        assert!(promoted.is_empty());
    }

    #[tokio::test]
    async fn ignores_other_hours_and_parks() {
        let store = InMemoryStore::new();
        let park_a = park(10, 0, 1);
        let park_b = park(10, 0, 1);
        store.add_park(park_a.clone()).await;
        store.add_park(park_b.clone()).await;
        store
            .seed(reservation(&park_a, 11, 1, ReservationStatus::InWaitlist), Some(at(1)))
            .await;
        store
            .seed(reservation(&park_b, 10, 1, ReservationStatus::InWaitlist), Some(at(1)))
            .await;

        let promoted = promoter(&store, quiet_notifier(0))
            .promote(park_a.park_id, at(10), at(5))
            .await
            .unwrap();
        assert!(promoted.is_empty());
    }

    #[tokio::test]
    async fn notifies_each_promoted_visitor() {
        let store = InMemoryStore::new();
        let park = park(10, 0, 1);
        store.add_park(park.clone()).await;
        let candidate = reservation(&park, 10, 3, ReservationStatus::InWaitlist);
        store.seed(candidate.clone(), Some(at(1))).await;

        let expected_id = candidate.reservation_id;
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(move |id, notification| {
                *id == expected_id
                    && notification.kind
                        == crate::model::notification::NotificationKind::WaitlistPromotion
            })
            .times(1)
            .return_const(());

        promoter(&store, notifier)
            .promote(park.park_id, at(10), at(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hours_already_under_way_are_never_offered() {
        let store = InMemoryStore::new();
        let park = park(10, 0, 3);
        store.add_park(park.clone()).await;
        let released = reservation(&park, 10, 10, ReservationStatus::Confirmed);
        let started = reservation(&park, 10, 2, ReservationStatus::InWaitlist);
        let upcoming = reservation(&park, 12, 2, ReservationStatus::InWaitlist);
        store.seed(started.clone(), Some(at(1))).await;
        store.seed(upcoming.clone(), Some(at(1))).await;

        let promoter = promoter(&store, quiet_notifier(1));
        let now = at(11) + chrono::Duration::minutes(30);
        assert!(promoter.promote(park.park_id, at(10), now).await.unwrap().is_empty());

        let promoted = promoter.promote_vacated(&released, now).await.unwrap();
        assert_eq!(promoted, vec![upcoming.reservation_id]);
        assert_eq!(
            store.reservation(started.reservation_id).await.unwrap().status,
            ReservationStatus::InWaitlist
        );
    }
}
