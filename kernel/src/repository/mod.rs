pub mod health;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod park;
pub mod reservation;
