use crate::{
    model::{id::ParkId, park::Park},
    repository::park::ParkRepository,
};
use shared::error::{AppError, AppResult};

pub mod admission;
pub mod lifecycle;
pub mod occupancy;
pub mod reconcile;
pub mod waitlist;

#[cfg(test)]
pub(crate) mod fixture;

pub(crate) async fn find_park(parks: &dyn ParkRepository, park_id: ParkId) -> AppResult<Park> {
    parks
        .find_by_id(park_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound(format!("park ({park_id}) was not found")))
}
