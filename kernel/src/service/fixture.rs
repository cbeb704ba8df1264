use crate::model::{
    id::{ParkId, ReservationId},
    park::Park,
    reservation::{price::VisitorType, status::ReservationStatus, Reservation, Visitor},
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Hour `h` (may exceed 23) counted from 2026-05-01T00:00Z.
pub fn at(h: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap() + Duration::hours(h)
}

pub fn park(max_capacity: i32, reserved_capacity: i32, stay_hours: i32) -> Park {
    Park {
        park_id: ParkId::new(),
        park_name: "Ein Gedi".into(),
        max_capacity,
        reserved_capacity,
        estimated_stay_hours: stay_hours,
        current_visitors: 0,
        unit_price: 4_000,
    }
}

pub fn visitor() -> Visitor {
    Visitor {
        visitor_id: "312345678".into(),
        email: "visitor@example.com".into(),
        phone: None,
    }
}

pub fn reservation(
    park: &Park,
    entry_hour: i64,
    party_size: i32,
    status: ReservationStatus,
) -> Reservation {
    let window = park.visit_window(at(entry_hour));
    Reservation {
        reservation_id: ReservationId::new(),
        park_id: park.park_id,
        visitor: visitor(),
        visitor_type: VisitorType::Family,
        party_size,
        entry_time: window.entry,
        exit_time: window.exit,
        price: 0,
        paid: false,
        status,
        status_changed_at: at(0),
        created_at: at(0),
    }
}
