//! Intercity bus reservation core: booking lifecycle, mobile-money payment
//! reconciliation, expiry of unpaid bookings and tiered reschedule pricing.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
