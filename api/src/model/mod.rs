pub mod dispatch;
pub mod reservation;
