use super::{dispatch::build_dispatch_routers, health::build_health_check_routers};
use axum::Router;
use registry::AppRegistry;

pub fn routes() -> Router<AppRegistry> {
    Router::new()
        .merge(build_health_check_routers())
        .nest("/api/v1", build_dispatch_routers())
}
