use crate::database::{model::park::ParkRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{id::ParkId, park::Park},
    repository::park::ParkRepository,
};
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct ParkRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ParkRepository for ParkRepositoryImpl {
    async fn find_by_id(&self, park_id: ParkId) -> AppResult<Option<Park>> {
        let row = sqlx::query_as::<_, ParkRow>(
            r#"
                SELECT
                    park_id,
                    park_name,
                    max_capacity,
                    reserved_capacity,
                    estimated_stay_hours,
                    current_visitors,
                    unit_price
                FROM parks
                WHERE park_id = $1
            "#,
        )
        .bind(park_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Park::from))
    }

    async fn adjust_current_visitors(&self, park_id: ParkId, delta: i32) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE parks
                SET current_visitors = GREATEST(current_visitors + $2, 0)
                WHERE park_id = $1
            "#,
        )
        .bind(park_id)
        .bind(delta)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;
        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "park ({park_id}) was not found"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn visitors_inside_never_go_negative(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let park_id = ParkId::new();
        sqlx::query(
            r#"
                INSERT INTO parks (park_id, park_name, max_capacity, unit_price)
                VALUES ($1, 'Hula Valley', 50, 3000)
            "#,
        )
        .bind(park_id)
        .execute(&pool)
        .await?;
        let repo = ParkRepositoryImpl::new(ConnectionPool::new(pool));

        repo.adjust_current_visitors(park_id, 4).await?;
        repo.adjust_current_visitors(park_id, -6).await?;

        let park = repo.find_by_id(park_id).await?.expect("park exists");
        assert_eq!(park.current_visitors, 0);
        assert_eq!(park.effective_capacity(), 50);
        assert_eq!(park.estimated_stay_hours, 1);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn adjusting_a_missing_park_is_not_found(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = ParkRepositoryImpl::new(ConnectionPool::new(pool));
        assert!(matches!(
            repo.adjust_current_visitors(ParkId::new(), 1).await,
            Err(AppError::EntityNotFound(_))
        ));
        Ok(())
    }
}
