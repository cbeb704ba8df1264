pub mod dispatcher;
pub mod handler;
pub mod model;
pub mod route;
