use crate::{
    dispatcher::{dispatch, Origin},
    model::dispatch::{DispatchRequest, DispatchResponse, DispatchStatus},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use registry::AppRegistry;
use serde_json::{json, Value};

pub async fn dispatch_operation(
    State(registry): State<AppRegistry>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<DispatchResponse>) {
    let request = match serde_json::from_value::<DispatchRequest>(body) {
        Ok(request) => request,
        Err(e) => {
            let response = DispatchResponse {
                status: DispatchStatus::Invalid,
                payload: json!({ "message": e.to_string() }),
            };
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };

    let response = dispatch(&registry, Origin::External, request, Utc::now()).await;
    (http_status(response.status), Json(response))
}

fn http_status(status: DispatchStatus) -> StatusCode {
    match status {
        DispatchStatus::Ok | DispatchStatus::Rejected => StatusCode::OK,
        DispatchStatus::Conflict => StatusCode::CONFLICT,
        DispatchStatus::NotFound => StatusCode::NOT_FOUND,
        DispatchStatus::Invalid => StatusCode::BAD_REQUEST,
        DispatchStatus::Forbidden => StatusCode::FORBIDDEN,
        DispatchStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
