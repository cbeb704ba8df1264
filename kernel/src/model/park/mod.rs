use crate::model::{id::ParkId, reservation::window::VisitWindow};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Park {
    pub park_id: ParkId,
    pub park_name: String,
    pub max_capacity: i32,
    /// Spots held back for a separate admission channel. Never bookable.
    pub reserved_capacity: i32,
    pub estimated_stay_hours: i32,
    pub current_visitors: i32,
    /// Per-visitor price in minor currency units.
    pub unit_price: i64,
}

impl Park {
    /// The ceiling every admission decision is bounded by.
    pub fn effective_capacity(&self) -> i32 {
        (self.max_capacity - self.reserved_capacity).max(0)
    }

    /// Exit time is fixed here, from the stay duration in force at admission.
    pub fn visit_window(&self, entry_time: DateTime<Utc>) -> VisitWindow {
        VisitWindow::new(entry_time, self.estimated_stay_hours)
    }
}
