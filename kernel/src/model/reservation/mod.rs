use crate::model::id::{ParkId, ReservationId};
use chrono::{DateTime, Utc};

pub mod event;
pub mod price;
pub mod status;
pub mod window;

use price::VisitorType;
use status::ReservationStatus;
use window::VisitWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub park_id: ParkId,
    pub visitor: Visitor,
    pub visitor_type: VisitorType,
    pub party_size: i32,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub price: i64,
    pub paid: bool,
    pub status: ReservationStatus,
    /// While notified, this doubles as the notification time.
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn window(&self) -> VisitWindow {
        VisitWindow {
            entry: self.entry_time,
            exit: self.exit_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub visitor_id: String,
    pub email: String,
    pub phone: Option<String>,
}

// A waitlisted reservation together with its enrollment time, which orders promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistedReservation {
    pub reservation: Reservation,
    pub enrolled_at: DateTime<Utc>,
}
