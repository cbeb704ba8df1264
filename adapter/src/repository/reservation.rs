use crate::database::{
    model::reservation::{ReservationRow, WaitlistedReservationRow, RESERVATION_COLUMNS},
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        id::{ParkId, ReservationId},
        reservation::{
            event::{CreateReservation, UpdateReservationStatus},
            status::ReservationStatus,
            Reservation, WaitlistedReservation,
        },
    },
    repository::reservation::{OccupancySource, ReservationRepository, SlotTransaction},
};
use shared::error::{AppError, AppResult};
use sqlx::{
    types::chrono::{DateTime, Utc},
    PgConnection, PgExecutor, Postgres, Transaction,
};

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    async fn begin_slot(&self, park_id: ParkId) -> AppResult<Box<dyn SlotTransaction>> {
        let mut tx = self.db.begin().await?;

        // Every capacity decision for a park queues on its row lock. Reads made
        // after the lock is granted see whatever the previous holder committed.
        let locked = sqlx::query_scalar::<_, ParkId>(
            r#"
                SELECT park_id FROM parks
                WHERE park_id = $1
                FOR UPDATE
            "#,
        )
        .bind(park_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
        if locked.is_none() {
            return Err(AppError::EntityNotFound(format!(
                "park ({park_id}) was not found"
            )));
        }

        Ok(Box::new(PgSlotTransaction { tx: Some(tx) }))
    }

    async fn occupancy(&self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32> {
        occupancy(self.db.inner_ref(), park_id, hour).await
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let sql = select_where("r.reservation_id = $1");
        sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(reservation_id)
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?
            .map(Reservation::try_from)
            .transpose()
    }

    async fn update_status(&self, event: UpdateReservationStatus) -> AppResult<bool> {
        update_status(self.db.inner_ref(), event).await
    }

    async fn list_waitlist(
        &self,
        park_id: ParkId,
        hour: DateTime<Utc>,
    ) -> AppResult<Vec<WaitlistedReservation>> {
        let sql = format!(
            r#"
                SELECT {RESERVATION_COLUMNS}, w.enrolled_at
                FROM reservations AS r
                INNER JOIN waitlist_entries AS w ON w.reservation_id = r.reservation_id
                WHERE r.park_id = $1
                  AND r.entry_time = $2
                  AND r.status = $3
                ORDER BY w.enrolled_at ASC
            "#
        );
        sqlx::query_as::<_, WaitlistedReservationRow>(&sql)
            .bind(park_id)
            .bind(hour)
            .bind(ReservationStatus::InWaitlist.as_ref())
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?
            .into_iter()
            .map(WaitlistedReservation::try_from)
            .collect()
    }

    async fn list_pending_notification(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        let sql = select_where("r.status = $1 AND r.entry_time > $2 AND r.entry_time <= $3");
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(ReservationStatus::WaitNotify.as_ref())
            .bind(after)
            .bind(until)
            .fetch_all(self.db.inner_ref())
            .await;
        into_reservations(rows)
    }

    async fn list_expired_notified(
        &self,
        entry_until: DateTime<Utc>,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        let sql =
            select_where("r.status = $1 AND r.entry_time <= $2 AND r.status_changed_at <= $3");
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(ReservationStatus::Notified.as_ref())
            .bind(entry_until)
            .bind(notified_before)
            .fetch_all(self.db.inner_ref())
            .await;
        into_reservations(rows)
    }

    async fn list_expired_waitlist_notifications(
        &self,
        notified_before: DateTime<Utc>,
    ) -> AppResult<Vec<Reservation>> {
        let sql = select_where("r.status = $1 AND r.status_changed_at <= $2");
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(ReservationStatus::NotifiedWaitlisted.as_ref())
            .bind(notified_before)
            .fetch_all(self.db.inner_ref())
            .await;
        into_reservations(rows)
    }

    async fn list_expired_waitlist(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let sql = select_where("r.status = ANY($1) AND r.entry_time <= $2");
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(status_names(&[
                ReservationStatus::InWaitlist,
                ReservationStatus::NotifiedWaitlisted,
            ]))
            .bind(now)
            .fetch_all(self.db.inner_ref())
            .await;
        into_reservations(rows)
    }

    async fn list_lapsed(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let sql = select_where("r.status = ANY($1) AND r.exit_time <= $2");
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(status_names(&[
                ReservationStatus::WaitNotify,
                ReservationStatus::Confirmed,
            ]))
            .bind(now)
            .fetch_all(self.db.inner_ref())
            .await;
        into_reservations(rows)
    }
}

/// Holds the park row lock taken in `begin_slot`. Dropping it without a
/// commit rolls the transaction back.
struct PgSlotTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSlotTransaction {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(AppError::StateConflict(
                "slot transaction has already been committed".into(),
            )),
        }
    }
}

#[async_trait]
impl OccupancySource for PgSlotTransaction {
    async fn occupancy(&mut self, park_id: ParkId, hour: DateTime<Utc>) -> AppResult<i32> {
        occupancy(self.conn()?, park_id, hour).await
    }
}

#[async_trait]
impl SlotTransaction for PgSlotTransaction {
    async fn insert(&mut self, event: CreateReservation) -> AppResult<ReservationId> {
        let reservation_id = ReservationId::new();
        let conn = self.conn()?;
        let res = sqlx::query(
            r#"
                INSERT INTO reservations
                (reservation_id, park_id, visitor_id, visitor_email, visitor_phone,
                visitor_type, party_size, entry_time, exit_time, price, paid,
                status, status_changed_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            "#,
        )
        .bind(reservation_id)
        .bind(event.park_id)
        .bind(&event.visitor.visitor_id)
        .bind(&event.visitor.email)
        .bind(&event.visitor.phone)
        .bind(event.visitor_type.as_ref())
        .bind(event.party_size)
        .bind(event.window.entry)
        .bind(event.window.exit)
        .bind(event.price)
        .bind(event.paid)
        .bind(event.status.as_ref())
        .bind(event.created_at)
        .execute(&mut *conn)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        if event.status == ReservationStatus::InWaitlist {
            sqlx::query(
                r#"
                    INSERT INTO waitlist_entries (reservation_id, park_id, entry_time, enrolled_at)
                    VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(reservation_id)
            .bind(event.park_id)
            .bind(event.window.entry)
            .bind(event.created_at)
            .execute(&mut *conn)
            .await
            .map_err(AppError::SpecificOperationError)?;
        }

        Ok(reservation_id)
    }

    async fn update_status(&mut self, event: UpdateReservationStatus) -> AppResult<bool> {
        update_status(self.conn()?, event).await
    }

    async fn delete(
        &mut self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
    ) -> AppResult<bool> {
        // waitlist_entries rows go with it through ON DELETE CASCADE.
        let res = sqlx::query(
            r#"
                DELETE FROM reservations
                WHERE reservation_id = $1 AND status = $2
            "#,
        )
        .bind(reservation_id)
        .bind(expected.as_ref())
        .execute(self.conn()?)
        .await
        .map_err(AppError::SpecificOperationError)?;
        Ok(res.rows_affected() == 1)
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self.tx.take().ok_or_else(|| {
            AppError::StateConflict("slot transaction has already been committed".into())
        })?;
        tx.commit().await.map_err(AppError::TransactionError)
    }
}

async fn occupancy<'e, E: PgExecutor<'e>>(
    executor: E,
    park_id: ParkId,
    hour: DateTime<Utc>,
) -> AppResult<i32> {
    sqlx::query_scalar::<_, i32>(
        r#"
            SELECT COALESCE(SUM(party_size), 0)::INT4
            FROM reservations
            WHERE park_id = $1
              AND entry_time <= $2
              AND exit_time > $2
              AND status = ANY($3)
        "#,
    )
    .bind(park_id)
    .bind(hour)
    .bind(status_names(&ReservationStatus::CAPACITY_HOLDING))
    .fetch_one(executor)
    .await
    .map_err(AppError::SpecificOperationError)
}

async fn update_status<'e, E: PgExecutor<'e>>(
    executor: E,
    event: UpdateReservationStatus,
) -> AppResult<bool> {
    let res = sqlx::query(
        r#"
            UPDATE reservations
            SET status = $3, status_changed_at = $4
            WHERE reservation_id = $1 AND status = $2
        "#,
    )
    .bind(event.reservation_id)
    .bind(event.from.as_ref())
    .bind(event.to.as_ref())
    .bind(event.changed_at)
    .execute(executor)
    .await
    .map_err(AppError::SpecificOperationError)?;
    Ok(res.rows_affected() == 1)
}

fn select_where(condition: &str) -> String {
    format!(
        r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations AS r
            WHERE {condition}
            ORDER BY r.entry_time ASC, r.created_at ASC
        "#
    )
}

fn status_names(statuses: &[ReservationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

fn into_reservations(rows: Result<Vec<ReservationRow>, sqlx::Error>) -> AppResult<Vec<Reservation>> {
    rows.map_err(AppError::SpecificOperationError)?
        .into_iter()
        .map(Reservation::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::park::ParkRepositoryImpl;
    use chrono::{Duration, TimeZone};
    use kernel::{
        model::reservation::{price::VisitorType, window::VisitWindow, Visitor},
        repository::park::ParkRepository,
    };

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    async fn insert_park(pool: &sqlx::PgPool, max: i32, reserved: i32) -> anyhow::Result<ParkId> {
        let park_id = ParkId::new();
        sqlx::query(
            r#"
                INSERT INTO parks
                (park_id, park_name, max_capacity, reserved_capacity, estimated_stay_hours, unit_price)
                VALUES ($1, 'Ein Gedi', $2, $3, 2, 4000)
            "#,
        )
        .bind(park_id)
        .bind(max)
        .bind(reserved)
        .execute(pool)
        .await?;
        Ok(park_id)
    }

    fn create(
        park_id: ParkId,
        entry_hour: i64,
        party_size: i32,
        status: ReservationStatus,
        created_at: DateTime<Utc>,
    ) -> CreateReservation {
        CreateReservation::new(
            park_id,
            Visitor {
                visitor_id: "visitor-1".into(),
                email: "visitor@example.com".into(),
                phone: None,
            },
            VisitorType::Family,
            party_size,
            VisitWindow::new(at(entry_hour), 2),
            6_800,
            false,
            status,
            created_at,
        )
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn slot_inserts_are_visible_to_occupancy_after_commit(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let park_id = insert_park(&pool, 100, 20).await?;
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));

        let mut tx = repo.begin_slot(park_id).await?;
        tx.insert(create(park_id, 10, 7, ReservationStatus::WaitNotify, at(0)))
            .await?;
        assert_eq!(tx.occupancy(park_id, at(11)).await?, 7);
        tx.commit().await?;

        assert_eq!(repo.occupancy(park_id, at(10)).await?, 7);
        assert_eq!(repo.occupancy(park_id, at(11)).await?, 7);
        assert_eq!(repo.occupancy(park_id, at(12)).await?, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn dropped_slot_rolls_back(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let park_id = insert_park(&pool, 100, 20).await?;
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));

        {
            let mut tx = repo.begin_slot(park_id).await?;
            tx.insert(create(park_id, 10, 7, ReservationStatus::WaitNotify, at(0)))
                .await?;
        }
        assert_eq!(repo.occupancy(park_id, at(10)).await?, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn status_update_is_compare_and_set(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let park_id = insert_park(&pool, 100, 20).await?;
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let mut tx = repo.begin_slot(park_id).await?;
        let id = tx
            .insert(create(park_id, 10, 2, ReservationStatus::WaitNotify, at(0)))
            .await?;
        tx.commit().await?;

        let notify = UpdateReservationStatus::new(
            id,
            ReservationStatus::WaitNotify,
            ReservationStatus::Notified,
            at(1),
        );
        assert!(repo.update_status(notify).await?);
        assert!(!repo.update_status(notify).await?);

        let stored = repo.find_by_id(id).await?.expect("reservation exists");
        assert_eq!(stored.status, ReservationStatus::Notified);
        assert_eq!(stored.status_changed_at, at(1));
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn waitlist_is_ordered_by_enrollment(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let park_id = insert_park(&pool, 10, 0).await?;
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let mut tx = repo.begin_slot(park_id).await?;
        let late = tx
            .insert(create(park_id, 10, 1, ReservationStatus::InWaitlist, at(3)))
            .await?;
        let early = tx
            .insert(create(park_id, 10, 1, ReservationStatus::InWaitlist, at(1)))
            .await?;
        tx.commit().await?;

        let ids: Vec<_> = repo
            .list_waitlist(park_id, at(10))
            .await?
            .into_iter()
            .map(|w| w.reservation.reservation_id)
            .collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(repo.occupancy(park_id, at(10)).await?, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn delete_removes_only_the_expected_status(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let park_id = insert_park(&pool, 10, 0).await?;
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let mut tx = repo.begin_slot(park_id).await?;
        let id = tx
            .insert(create(park_id, 10, 1, ReservationStatus::InWaitlist, at(1)))
            .await?;
        assert!(!tx.delete(id, ReservationStatus::Confirmed).await?);
        assert!(tx.delete(id, ReservationStatus::InWaitlist).await?);
        tx.commit().await?;

        assert!(repo.find_by_id(id).await?.is_none());
        assert!(repo.list_waitlist(park_id, at(10)).await?.is_empty());
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn slot_for_a_missing_park_is_not_found(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        assert!(matches!(
            repo.begin_slot(ParkId::new()).await,
            Err(AppError::EntityNotFound(_))
        ));

        let parks = ParkRepositoryImpl::new(ConnectionPool::new(pool));
        assert!(parks.find_by_id(ParkId::new()).await?.is_none());
        Ok(())
    }
}
