pub mod health;
pub mod park;
pub mod reservation;
