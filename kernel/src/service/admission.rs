use crate::{
    model::{
        id::{ParkId, ReservationId},
        park::Park,
        reservation::{
            event::CreateReservation,
            price::{quote, VisitorType},
            status::ReservationStatus,
            window::VisitWindow,
            Visitor,
        },
    },
    repository::{
        park::ParkRepository,
        reservation::{ReservationRepository, SlotTransaction, Snapshot},
    },
    service::{
        find_park,
        occupancy::{check_window, WindowCheck},
        waitlist::WaitlistPromoter,
    },
};
use chrono::{DateTime, Duration, Utc};
use derive_new::new;
use serde::Serialize;
use shared::error::{AppError, AppResult};
use std::sync::Arc;
use strum::{AsRefStr, Display};

#[derive(new, Debug, Clone)]
pub struct ReservationRequest {
    pub park_id: ParkId,
    pub visitor: Visitor,
    pub visitor_type: VisitorType,
    pub party_size: i32,
    pub entry_time: DateTime<Utc>,
    pub paid: bool,
    /// Put the request on the waitlist instead of rejecting it when the
    /// window is full.
    pub join_waitlist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionReason {
    /// The party is larger than the park itself.
    TooLarge,
    /// Some hour of the requested window has no free capacity.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Approved {
        reservation_id: ReservationId,
        price: i64,
        exit_time: DateTime<Utc>,
    },
    Waitlisted {
        reservation_id: ReservationId,
        price: i64,
        exit_time: DateTime<Utc>,
    },
    Rejected {
        reason: RejectionReason,
    },
}

#[derive(new, Clone)]
pub struct AdmissionController {
    parks: Arc<dyn ParkRepository>,
    reservations: Arc<dyn ReservationRepository>,
    promoter: WaitlistPromoter,
}

impl AdmissionController {
    pub async fn try_admit(
        &self,
        request: ReservationRequest,
        now: DateTime<Utc>,
    ) -> AppResult<AdmissionOutcome> {
        let park = find_park(self.parks.as_ref(), request.park_id).await?;
        let window = validate(&park, &request, now)?;
        if request.party_size > park.max_capacity {
            return Ok(AdmissionOutcome::Rejected {
                reason: RejectionReason::TooLarge,
            });
        }

        let mut tx = self.reservations.begin_slot(park.park_id).await?;
        let outcome = admit_within(&mut *tx, &park, &request, window, now).await?;
        if !matches!(outcome, AdmissionOutcome::Rejected { .. }) {
            tx.commit().await?;
        }
        log_outcome(&park, &request, &outcome);
        Ok(outcome)
    }

    /// Start times on each of the next `lookahead_days` days, at the same hour
    /// of day as `entry_time`, that would be approved right now. Starts at or
    /// before `now` are never offered.
    pub async fn find_available_starts(
        &self,
        park_id: ParkId,
        party_size: i32,
        entry_time: DateTime<Utc>,
        lookahead_days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let park = find_park(self.parks.as_ref(), park_id).await?;
        if party_size < 1 || party_size > park.max_capacity {
            return Ok(Vec::new());
        }

        let mut snapshot = Snapshot(self.reservations.as_ref());
        let mut starts = Vec::new();
        for offset in 1..=i64::from(lookahead_days) {
            let window = park.visit_window(entry_time + Duration::days(offset));
            if window.entry <= now {
                continue;
            }
            if check_window(&mut snapshot, &park, &window, party_size).await? == WindowCheck::Fits
            {
                starts.push(window.entry);
            }
        }
        Ok(starts)
    }

    /// Discards a reservation and admits a replacement in one slot
    /// transaction. When the replacement is rejected nothing changes.
    pub async fn rebook(
        &self,
        reservation_id: ReservationId,
        entry_time: DateTime<Utc>,
        party_size: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<AdmissionOutcome> {
        let old = self
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("reservation ({reservation_id}) was not found"))
            })?;
        if !old.status.is_rebookable() {
            return Err(AppError::StateConflict(format!(
                "cannot rebook a reservation in state {}",
                old.status
            )));
        }

        let park = find_park(self.parks.as_ref(), old.park_id).await?;
        let request = ReservationRequest {
            park_id: old.park_id,
            visitor: old.visitor.clone(),
            visitor_type: old.visitor_type,
            party_size: party_size.unwrap_or(old.party_size),
            entry_time,
            paid: old.paid,
            join_waitlist: false,
        };
        let window = validate(&park, &request, now)?;
        if request.party_size > park.max_capacity {
            return Ok(AdmissionOutcome::Rejected {
                reason: RejectionReason::TooLarge,
            });
        }

        let outcome = {
            let mut tx = self.reservations.begin_slot(park.park_id).await?;
            if !tx.delete(old.reservation_id, old.status).await? {
                return Err(AppError::StateConflict(format!(
                    "reservation ({reservation_id}) changed while rebooking"
                )));
            }
            let outcome = admit_within(&mut *tx, &park, &request, window, now).await?;
            if let AdmissionOutcome::Rejected { .. } = outcome {
                return Ok(outcome);
            }
            tx.commit().await?;
            outcome
        };
        tracing::info!(
            old_reservation_id = %old.reservation_id,
            park_id = %park.park_id,
            entry_time = %window.entry,
            "reservation discarded and rebooked"
        );

        if old.status.holds_capacity() {
            if let Err(e) = self.promoter.promote_vacated(&old, now).await {
                tracing::warn!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "waitlist promotion after rebooking failed"
                );
            }
        }
        Ok(outcome)
    }
}

fn validate(park: &Park, request: &ReservationRequest, now: DateTime<Utc>) -> AppResult<VisitWindow> {
    if request.party_size < 1 {
        return Err(AppError::UnprocessableEntity(
            "party size must be at least 1".into(),
        ));
    }
    let window = park.visit_window(request.entry_time);
    if window.entry <= now {
        return Err(AppError::UnprocessableEntity(format!(
            "entry time {} is not in the future",
            window.entry
        )));
    }
    Ok(window)
}

async fn admit_within(
    tx: &mut dyn SlotTransaction,
    park: &Park,
    request: &ReservationRequest,
    window: VisitWindow,
    now: DateTime<Utc>,
) -> AppResult<AdmissionOutcome> {
    let fits =
        check_window(&mut *tx, park, &window, request.party_size).await? == WindowCheck::Fits;
    let status = match (fits, request.join_waitlist) {
        (true, _) => ReservationStatus::WaitNotify,
        (false, true) => ReservationStatus::InWaitlist,
        (false, false) => {
            return Ok(AdmissionOutcome::Rejected {
                reason: RejectionReason::Unavailable,
            })
        }
    };

    let price = quote(
        park.unit_price,
        request.party_size,
        request.visitor_type,
        request.paid,
    );
    let reservation_id = tx
        .insert(CreateReservation::new(
            park.park_id,
            request.visitor.clone(),
            request.visitor_type,
            request.party_size,
            window,
            price,
            request.paid,
            status,
            now,
        ))
        .await?;

    Ok(if fits {
        AdmissionOutcome::Approved {
            reservation_id,
            price,
            exit_time: window.exit,
        }
    } else {
        AdmissionOutcome::Waitlisted {
            reservation_id,
            price,
            exit_time: window.exit,
        }
    })
}

fn log_outcome(park: &Park, request: &ReservationRequest, outcome: &AdmissionOutcome) {
    match outcome {
        AdmissionOutcome::Approved { reservation_id, .. } => tracing::info!(
            %reservation_id,
            park_id = %park.park_id,
            party_size = request.party_size,
            "reservation admitted"
        ),
        AdmissionOutcome::Waitlisted { reservation_id, .. } => tracing::info!(
            %reservation_id,
            park_id = %park.park_id,
            party_size = request.party_size,
            "reservation placed on the waitlist"
        ),
        AdmissionOutcome::Rejected { reason } => tracing::info!(
            park_id = %park.park_id,
            party_size = request.party_size,
            %reason,
            "reservation rejected"
        ),
    }
}
