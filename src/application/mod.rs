//! Application layer: the reservation state machine and the expiry
//! watchdog that drives it on a schedule.

pub mod reservations;
pub mod watchdog;
