use crate::{
    model::{
        id::ParkId,
        park::Park,
        reservation::window::{truncate_to_hour, VisitWindow},
    },
    repository::{
        park::ParkRepository,
        reservation::{OccupancySource, ReservationRepository, Snapshot},
    },
    service::find_park,
};
use chrono::{DateTime, Utc};
use derive_new::new;
use shared::error::AppResult;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub committed: i32,
    pub effective_capacity: i32,
}

impl Occupancy {
    pub fn fits(&self, party_size: i32) -> bool {
        self.committed + party_size <= self.effective_capacity
    }

    pub fn available(&self) -> i32 {
        (self.effective_capacity - self.committed).max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCheck {
    Fits,
    /// The first hour of the window that cannot take the party.
    Full {
        hour: DateTime<Utc>,
        occupancy: Occupancy,
    },
}

#[derive(new, Clone)]
pub struct CapacityOracle {
    parks: Arc<dyn ParkRepository>,
    reservations: Arc<dyn ReservationRepository>,
}

impl CapacityOracle {
    /// Occupancy of the hour containing `time`.
    pub async fn park_occupancy(&self, park_id: ParkId, time: DateTime<Utc>) -> AppResult<Occupancy> {
        let park = find_park(self.parks.as_ref(), park_id).await?;
        self.occupancy_at(&park, truncate_to_hour(time)).await
    }

    pub async fn occupancy_at(&self, park: &Park, hour: DateTime<Utc>) -> AppResult<Occupancy> {
        occupancy_at(&mut Snapshot(self.reservations.as_ref()), park, hour).await
    }

    pub async fn check_window(
        &self,
        park: &Park,
        window: &VisitWindow,
        party_size: i32,
    ) -> AppResult<WindowCheck> {
        check_window(
            &mut Snapshot(self.reservations.as_ref()),
            park,
            window,
            party_size,
        )
        .await
    }
}

pub async fn occupancy_at<S>(source: &mut S, park: &Park, hour: DateTime<Utc>) -> AppResult<Occupancy>
where
    S: OccupancySource + ?Sized,
{
    let committed = source.occupancy(park.park_id, hour).await?;
    Ok(Occupancy {
        committed,
        effective_capacity: park.effective_capacity(),
    })
}

/// Runs the occupancy check for every hour of `window`. The whole window fits
/// or it does not; there is no partial admission.
pub async fn check_window<S>(
    source: &mut S,
    park: &Park,
    window: &VisitWindow,
    party_size: i32,
) -> AppResult<WindowCheck>
where
    S: OccupancySource + ?Sized,
{
    for hour in window.hours() {
        let occupancy = occupancy_at(source, park, hour).await?;
        if !occupancy.fits(party_size) {
            tracing::debug!(
                park_id = %park.park_id,
                %hour,
                committed = occupancy.committed,
                effective_capacity = occupancy.effective_capacity,
                party_size,
                "hour is full"
            );
            return Ok(WindowCheck::Full { hour, occupancy });
        }
    }
    Ok(WindowCheck::Fits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::reservation::status::ReservationStatus,
        repository::memory::InMemoryStore,
        service::fixture::{at, park, reservation},
    };
    use shared::error::AppError;

    #[tokio::test]
    async fn counts_only_capacity_holding_reservations_covering_the_hour() {
        let store = InMemoryStore::new();
        let park = park(100, 20, 2);
        store.add_park(park.clone()).await;
        store.seed(reservation(&park, 10, 30, ReservationStatus::Confirmed), None).await;
        store.seed(reservation(&park, 9, 5, ReservationStatus::InPark), None).await;
        store.seed(reservation(&park, 10, 7, ReservationStatus::InWaitlist), None).await;
        store.seed(reservation(&park, 10, 11, ReservationStatus::Cancelled), None).await;
        store.seed(reservation(&park, 8, 13, ReservationStatus::Notified), None).await;

        let oracle = CapacityOracle::new(Arc::new(store.clone()), Arc::new(store));
        let occupancy = oracle.occupancy_at(&park, at(10)).await.unwrap();
        assert_eq!(
            occupancy,
            Occupancy {
                committed: 35,
                effective_capacity: 80
            }
        );
        assert_eq!(occupancy.available(), 45);
    }

    #[tokio::test]
    async fn reports_the_first_full_hour_of_a_window() {
        let store = InMemoryStore::new();
        let park = park(100, 20, 3);
        store.add_park(park.clone()).await;
        store.seed(reservation(&park, 12, 75, ReservationStatus::WaitNotify), None).await;

        let oracle = CapacityOracle::new(Arc::new(store.clone()), Arc::new(store));
        let window = park.visit_window(at(10));
        assert_eq!(oracle.check_window(&park, &window, 5).await.unwrap(), WindowCheck::Fits);
        match oracle.check_window(&park, &window, 6).await.unwrap() {
            WindowCheck::Full { hour, occupancy } => {
                assert_eq!(hour, at(12));
                assert_eq!(occupancy.committed, 75);
            }
            WindowCheck::Fits => panic!("window should be full at noon"),
        }
    }

    #[tokio::test]
    async fn park_occupancy_reads_the_hour_containing_the_time() {
        let store = InMemoryStore::new();
        let park = park(100, 20, 2);
        store.add_park(park.clone()).await;
        store.seed(reservation(&park, 10, 30, ReservationStatus::Confirmed), None).await;

        let oracle = CapacityOracle::new(Arc::new(store.clone()), Arc::new(store));
        let occupancy = oracle
            .park_occupancy(park.park_id, at(11) + chrono::Duration::minutes(45))
            .await
            .unwrap();
        assert_eq!(occupancy.committed, 30);
        assert!(matches!(
            oracle.park_occupancy(ParkId::new(), at(11)).await,
            Err(AppError::EntityNotFound(_))
        ));
    }

    #[tokio::test]
    async fn storage_failure_is_never_reported_as_available() {
        let store = InMemoryStore::new();
        let park = park(100, 20, 1);
        store.set_failing(true);
        let oracle = CapacityOracle::new(Arc::new(store.clone()), Arc::new(store));
        let result = oracle.occupancy_at(&park, at(10)).await;
        assert!(matches!(result, Err(AppError::SpecificOperationError(_))));
    }
}
