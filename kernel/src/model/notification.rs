use crate::model::{id::ParkId, reservation::Reservation};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    VisitReminder,
    WaitlistPromotion,
}

/// Channel-independent message; delivery is up to the `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub park_id: ParkId,
    pub recipient: String,
    pub entry_time: DateTime<Utc>,
    pub message: String,
}

impl Notification {
    pub fn visit_reminder(reservation: &Reservation) -> Self {
        Self {
            kind: NotificationKind::VisitReminder,
            park_id: reservation.park_id,
            recipient: reservation.visitor.email.clone(),
            entry_time: reservation.entry_time,
            message: format!(
                "Your visit for {} people starts at {}. Please confirm within 2 hours or the reservation will be cancelled.",
                reservation.party_size,
                reservation.entry_time.format("%Y-%m-%d %H:%M")
            ),
        }
    }

    pub fn waitlist_promotion(reservation: &Reservation) -> Self {
        Self {
            kind: NotificationKind::WaitlistPromotion,
            park_id: reservation.park_id,
            recipient: reservation.visitor.email.clone(),
            entry_time: reservation.entry_time,
            message: format!(
                "A place opened up for your party of {} at {}. Please confirm within 2 hours to keep it.",
                reservation.party_size,
                reservation.entry_time.format("%Y-%m-%d %H:%M")
            ),
        }
    }
}
