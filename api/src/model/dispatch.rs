use super::reservation::{
    CreateReservationRequest, OccupancyRequest, PromoteWaitlistRequest,
    RebookReservationRequest, ReservationIdRequest, SearchAvailableDatesRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::error::AppError;

/// `{ "operation": <name>, "data": {...} }`
#[derive(Debug, Deserialize)]
#[serde(tag = "operation", content = "data", rename_all = "kebab-case")]
pub enum DispatchRequest {
    CreateReservation(CreateReservationRequest),
    CancelReservation(ReservationIdRequest),
    ConfirmReservation(ReservationIdRequest),
    CheckIn(ReservationIdRequest),
    CheckOut(ReservationIdRequest),
    SearchAvailableDates(SearchAvailableDatesRequest),
    PromoteWaitlist(PromoteWaitlistRequest),
    RebookReservation(RebookReservationRequest),
    GetReservation(ReservationIdRequest),
    GetOccupancy(OccupancyRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Ok,
    Rejected,
    Conflict,
    NotFound,
    Invalid,
    Forbidden,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub status: DispatchStatus,
    pub payload: Value,
}

impl DispatchResponse {
    pub fn ok(payload: impl Serialize) -> Self {
        Self::with_status(DispatchStatus::Ok, payload)
    }

    pub fn with_status(status: DispatchStatus, payload: impl Serialize) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Self { status, payload },
            Err(e) => Self::from(AppError::ConversionEntityError(e.to_string())),
        }
    }
}

impl From<&AppError> for DispatchStatus {
    fn from(value: &AppError) -> Self {
        match value {
            AppError::UnprocessableEntity(_)
            | AppError::ValidationError(_)
            | AppError::ConvertToUuidError(_) => DispatchStatus::Invalid,
            AppError::EntityNotFound(_) => DispatchStatus::NotFound,
            AppError::StateConflict(_) => DispatchStatus::Conflict,
            AppError::ForbiddenOperation => DispatchStatus::Forbidden,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ConversionEntityError(_)
            | AppError::ExternalServiceError(_) => DispatchStatus::Error,
        }
    }
}

impl From<AppError> for DispatchResponse {
    fn from(value: AppError) -> Self {
        let status = DispatchStatus::from(&value);
        // Internal details stay in the log.
        let message = match status {
            DispatchStatus::Error => "internal error".to_string(),
            _ => value.to_string(),
        };
        Self {
            status,
            payload: json!({ "message": message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_tagged_in_kebab_case() {
        let request: DispatchRequest = serde_json::from_value(json!({
            "operation": "check-in",
            "data": { "reservationId": "0b8a3c42-7c1e-4f3e-9a61-0d6f5b1e2a10" }
        }))
        .unwrap();
        assert!(matches!(request, DispatchRequest::CheckIn(_)));

        let unknown = serde_json::from_value::<DispatchRequest>(json!({
            "operation": "book-table",
            "data": {}
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn errors_map_to_response_statuses() {
        let cases = [
            (AppError::EntityNotFound("gone".into()), DispatchStatus::NotFound),
            (AppError::StateConflict("moved".into()), DispatchStatus::Conflict),
            (AppError::UnprocessableEntity("past".into()), DispatchStatus::Invalid),
            (AppError::ForbiddenOperation, DispatchStatus::Forbidden),
            (AppError::ExternalServiceError("down".into()), DispatchStatus::Error),
        ];
        for (error, status) in cases {
            assert_eq!(DispatchResponse::from(error).status, status);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let response =
            DispatchResponse::from(AppError::ConversionEntityError("bad row 42".into()));
        assert_eq!(response.payload["message"], "internal error");
    }
}
