pub mod id;
pub mod notification;
pub mod park;
pub mod reservation;
