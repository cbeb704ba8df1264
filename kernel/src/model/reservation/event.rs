use crate::model::{
    id::{ParkId, ReservationId},
    reservation::{price::VisitorType, status::ReservationStatus, window::VisitWindow, Visitor},
};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(new, Debug, Clone)]
pub struct CreateReservation {
    pub park_id: ParkId,
    pub visitor: Visitor,
    pub visitor_type: VisitorType,
    pub party_size: i32,
    pub window: VisitWindow,
    pub price: i64,
    pub paid: bool,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// Compare-and-set: applies only while the stored status still equals `from`.
#[derive(new, Debug, Clone, Copy)]
pub struct UpdateReservationStatus {
    pub reservation_id: ReservationId,
    pub from: ReservationStatus,
    pub to: ReservationStatus,
    pub changed_at: DateTime<Utc>,
}
