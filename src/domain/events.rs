use serde::{Deserialize, Serialize};

/// Lifecycle events handed to the external notification/email pipeline.
/// Fire-and-forget; the consumer assumes at-least-once delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum BookingEvent {
    BookingConfirmed {
        booking_number: String,
    },
    BookingExpired {
        booking_number: String,
    },
    BookingRescheduled {
        old_booking_number: String,
        new_booking_number: String,
    },
}
