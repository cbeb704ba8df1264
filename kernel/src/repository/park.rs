use crate::model::{id::ParkId, park::Park};
use async_trait::async_trait;
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait ParkRepository: Send + Sync {
    async fn find_by_id(&self, park_id: ParkId) -> AppResult<Option<Park>>;
    // Applies `delta` to the number of visitors currently inside the park
    async fn adjust_current_visitors(&self, park_id: ParkId, delta: i32) -> AppResult<()>;
}
