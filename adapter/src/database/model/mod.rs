pub mod park;
pub mod reservation;
