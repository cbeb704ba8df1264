use kernel::model::{
    id::{ParkId, ReservationId},
    reservation::{Reservation, Visitor, WaitlistedReservation},
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

/// Column list matching [`ReservationRow`], for reuse across queries.
pub const RESERVATION_COLUMNS: &str = r#"
    r.reservation_id,
    r.park_id,
    r.visitor_id,
    r.visitor_email,
    r.visitor_phone,
    r.visitor_type,
    r.party_size,
    r.entry_time,
    r.exit_time,
    r.price,
    r.paid,
    r.status,
    r.status_changed_at,
    r.created_at
"#;

#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub park_id: ParkId,
    pub visitor_id: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub visitor_type: String,
    pub party_size: i32,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub price: i64,
    pub paid: bool,
    pub status: String,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            park_id,
            visitor_id,
            visitor_email,
            visitor_phone,
            visitor_type,
            party_size,
            entry_time,
            exit_time,
            price,
            paid,
            status,
            status_changed_at,
            created_at,
        } = value;
        Ok(Reservation {
            reservation_id,
            park_id,
            visitor: Visitor {
                visitor_id,
                email: visitor_email,
                phone: visitor_phone,
            },
            visitor_type: visitor_type.parse().map_err(|_| {
                AppError::ConversionEntityError(format!(
                    "unknown visitor type '{visitor_type}' on reservation {reservation_id}"
                ))
            })?,
            party_size,
            entry_time,
            exit_time,
            price,
            paid,
            status: status.parse().map_err(|_| {
                AppError::ConversionEntityError(format!(
                    "unknown status '{status}' on reservation {reservation_id}"
                ))
            })?,
            status_changed_at,
            created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct WaitlistedReservationRow {
    #[sqlx(flatten)]
    pub reservation: ReservationRow,
    pub enrolled_at: DateTime<Utc>,
}

impl TryFrom<WaitlistedReservationRow> for WaitlistedReservation {
    type Error = AppError;

    fn try_from(value: WaitlistedReservationRow) -> Result<Self, Self::Error> {
        Ok(WaitlistedReservation {
            reservation: value.reservation.try_into()?,
            enrolled_at: value.enrolled_at,
        })
    }
}
