use crate::model::{
    dispatch::{DispatchRequest, DispatchResponse, DispatchStatus},
    reservation::{
        AdmissionResponse, AvailableDatesResponse, OccupancyResponse, PromotedResponse,
        ReservationResponse,
    },
};
use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::{
    model::reservation::{window::truncate_to_hour, Reservation},
    service::admission::AdmissionOutcome,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

/// Where a request came from. Some operations are reserved for in-process
/// callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    External,
    Internal,
}

pub async fn dispatch(
    registry: &AppRegistry,
    origin: Origin,
    request: DispatchRequest,
    now: DateTime<Utc>,
) -> DispatchResponse {
    match handle(registry, origin, request, now).await {
        Ok(response) => response,
        Err(e) => {
            if DispatchStatus::from(&e) == DispatchStatus::Error {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "dispatch failed"
                );
            }
            DispatchResponse::from(e)
        }
    }
}

async fn handle(
    registry: &AppRegistry,
    origin: Origin,
    request: DispatchRequest,
    now: DateTime<Utc>,
) -> AppResult<DispatchResponse> {
    match request {
        DispatchRequest::CreateReservation(req) => {
            req.validate(&())?;
            let outcome = registry
                .admission_controller()
                .try_admit(req.into(), now)
                .await?;
            Ok(admission_response(outcome))
        }
        DispatchRequest::RebookReservation(req) => {
            req.validate(&())?;
            let outcome = registry
                .admission_controller()
                .rebook(req.reservation_id, req.entry_time, req.party_size, now)
                .await?;
            Ok(admission_response(outcome))
        }
        DispatchRequest::CancelReservation(req) => registry
            .lifecycle_service()
            .cancel(req.reservation_id, now)
            .await
            .map(reservation_response),
        DispatchRequest::ConfirmReservation(req) => registry
            .lifecycle_service()
            .confirm(req.reservation_id, now)
            .await
            .map(reservation_response),
        DispatchRequest::CheckIn(req) => registry
            .lifecycle_service()
            .check_in(req.reservation_id, now)
            .await
            .map(reservation_response),
        DispatchRequest::CheckOut(req) => registry
            .lifecycle_service()
            .check_out(req.reservation_id, now)
            .await
            .map(reservation_response),
        DispatchRequest::GetReservation(req) => registry
            .lifecycle_service()
            .find(req.reservation_id)
            .await
            .map(reservation_response),
        DispatchRequest::SearchAvailableDates(req) => {
            req.validate(&())?;
            let lookahead_days = req
                .lookahead_days
                .unwrap_or(registry.admission_config().lookahead_days);
            let available_starts = registry
                .admission_controller()
                .find_available_starts(
                    req.park_id,
                    req.party_size,
                    req.entry_time,
                    lookahead_days,
                    now,
                )
                .await?;
            Ok(DispatchResponse::ok(AvailableDatesResponse { available_starts }))
        }
        DispatchRequest::GetOccupancy(req) => registry
            .capacity_oracle()
            .park_occupancy(req.park_id, req.hour)
            .await
            .map(|occupancy| DispatchResponse::ok(OccupancyResponse::from(occupancy))),
        DispatchRequest::PromoteWaitlist(req) => {
            if origin != Origin::Internal {
                return Err(AppError::ForbiddenOperation);
            }
            let promoted = registry
                .waitlist_promoter()
                .promote(req.park_id, truncate_to_hour(req.hour), now)
                .await?;
            Ok(DispatchResponse::ok(PromotedResponse { promoted }))
        }
    }
}

fn admission_response(outcome: AdmissionOutcome) -> DispatchResponse {
    let status = match outcome {
        AdmissionOutcome::Rejected { .. } => DispatchStatus::Rejected,
        AdmissionOutcome::Approved { .. } | AdmissionOutcome::Waitlisted { .. } => {
            DispatchStatus::Ok
        }
    };
    DispatchResponse::with_status(status, AdmissionResponse::from(outcome))
}

fn reservation_response(reservation: Reservation) -> DispatchResponse {
    DispatchResponse::ok(ReservationResponse::from(reservation))
}
