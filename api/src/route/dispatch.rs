use axum::{routing::post, Router};
use registry::AppRegistry;

use crate::handler::dispatch::dispatch_operation;

pub fn build_dispatch_routers() -> Router<AppRegistry> {
    Router::new().route("/dispatch", post(dispatch_operation))
}
