pub mod reservation;

pub use reservation::{ReservationService, RetryPolicy};
