//! Domain layer: booking documents, the reschedule fee engine, lifecycle
//! events and the ports the application core depends on.

pub mod booking;
pub mod events;
pub mod fees;
pub mod payment;
pub mod ports;
