use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::{
    model::{
        id::{ParkId, ReservationId},
        reservation::{price::VisitorType, status::ReservationStatus, Reservation, Visitor},
    },
    service::{
        admission::{AdmissionOutcome, RejectionReason, ReservationRequest},
        occupancy::Occupancy,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(skip)]
    pub park_id: ParkId,
    #[garde(length(min = 1))]
    pub visitor_id: String,
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub phone: Option<String>,
    #[garde(skip)]
    pub visitor_type: VisitorType,
    #[garde(range(min = 1))]
    pub party_size: i32,
    #[garde(skip)]
    pub entry_time: DateTime<Utc>,
    #[serde(default)]
    #[garde(skip)]
    pub paid: bool,
    #[serde(default)]
    #[garde(skip)]
    pub join_waitlist: bool,
}

impl From<CreateReservationRequest> for ReservationRequest {
    fn from(value: CreateReservationRequest) -> Self {
        let CreateReservationRequest {
            park_id,
            visitor_id,
            email,
            phone,
            visitor_type,
            party_size,
            entry_time,
            paid,
            join_waitlist,
        } = value;
        ReservationRequest::new(
            park_id,
            Visitor {
                visitor_id,
                email,
                phone,
            },
            visitor_type,
            party_size,
            entry_time,
            paid,
            join_waitlist,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationIdRequest {
    #[garde(skip)]
    pub reservation_id: ReservationId,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchAvailableDatesRequest {
    #[garde(skip)]
    pub park_id: ParkId,
    #[garde(range(min = 1))]
    pub party_size: i32,
    #[garde(skip)]
    pub entry_time: DateTime<Utc>,
    #[garde(range(min = 1, max = 90))]
    pub lookahead_days: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromoteWaitlistRequest {
    #[garde(skip)]
    pub park_id: ParkId,
    #[garde(skip)]
    pub hour: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RebookReservationRequest {
    #[garde(skip)]
    pub reservation_id: ReservationId,
    #[garde(skip)]
    pub entry_time: DateTime<Utc>,
    #[garde(range(min = 1))]
    pub party_size: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyRequest {
    #[garde(skip)]
    pub park_id: ParkId,
    #[garde(skip)]
    pub hour: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmissionResponse {
    #[serde(rename_all = "camelCase")]
    Approved {
        reservation_id: ReservationId,
        price: i64,
        exit_time: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Waitlisted {
        reservation_id: ReservationId,
        price: i64,
        exit_time: DateTime<Utc>,
    },
    Rejected { reason: RejectionReason },
}

impl From<AdmissionOutcome> for AdmissionResponse {
    fn from(value: AdmissionOutcome) -> Self {
        match value {
            AdmissionOutcome::Approved {
                reservation_id,
                price,
                exit_time,
            } => Self::Approved {
                reservation_id,
                price,
                exit_time,
            },
            AdmissionOutcome::Waitlisted {
                reservation_id,
                price,
                exit_time,
            } => Self::Waitlisted {
                reservation_id,
                price,
                exit_time,
            },
            AdmissionOutcome::Rejected { reason } => Self::Rejected { reason },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub park_id: ParkId,
    pub visitor_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub visitor_type: VisitorType,
    pub party_size: i32,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub price: i64,
    pub paid: bool,
    pub status: ReservationStatus,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
            reservation_id,
            park_id,
            visitor,
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
        Self {
            reservation_id,
            park_id,
            visitor_id: visitor.visitor_id,
            email: visitor.email,
            phone: visitor.phone,
            visitor_type,
            party_size,
            entry_time,
            exit_time,
            price,
            paid,
            status,
            status_changed_at,
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDatesResponse {
    pub available_starts: Vec<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotedResponse {
    pub promoted: Vec<ReservationId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyResponse {
    pub committed: i32,
    pub effective_capacity: i32,
    pub available: i32,
}

impl From<Occupancy> for OccupancyResponse {
    fn from(value: Occupancy) -> Self {
        Self {
            committed: value.committed,
            effective_capacity: value.effective_capacity,
            available: value.available(),
        }
    }
}
