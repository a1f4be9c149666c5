use crate::error::BookingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A positive monetary amount in the minor currency unit.
///
/// Wrapper around `u64` to keep zero and negative values out of the domain;
/// signed arithmetic (price differences, credits) happens on `i64` at the
/// fee-engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, BookingError> {
        if value == 0 {
            Err(BookingError::Validation(
                "amount must be positive".to_string(),
            ))
        } else if value > i64::MAX as u64 {
            // Keeps `signed()` lossless for the fee engine's arithmetic.
            Err(BookingError::Validation(
                "amount out of range".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn signed(&self) -> i64 {
        self.0 as i64
    }
}

impl TryFrom<u64> for Amount {
    type Error = BookingError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The trip a booking holds a seat on. Trip search and seat availability are
/// external; callers pass the chosen trip in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: String,
    pub departure: DateTime<Utc>,
    pub price: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PaymentMethod {
    MobileMoney { provider: String, phone: String },
    Agency { code: String },
}

impl PaymentMethod {
    pub fn is_mobile_money(&self) -> bool {
        matches!(self, Self::MobileMoney { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    ReportPending,
    Reported,
    Cancelled,
    Expired,
}

impl BookingStatus {
    /// Terminal states are never left; the booking is retained for audit
    /// and reschedule-count computation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reported | Self::Cancelled | Self::Expired)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingPayment => "PendingPayment",
            Self::Confirmed => "Confirmed",
            Self::ReportPending => "ReportPending",
            Self::Reported => "Reported",
            Self::Cancelled => "Cancelled",
            Self::Expired => "Expired",
        };
        f.write_str(s)
    }
}

/// A seat reservation and its payment reconciliation state.
///
/// Mutated only by the reservation engine under compare-and-swap discipline;
/// never deleted, only marked terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_number: String,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub trip: Trip,
    /// What the traveler still owes on this booking.
    pub amount_due: Amount,
    /// Full value of the seat. Equal to `amount_due` on a first booking;
    /// stays the full new-trip price on a rescheduled booking even when
    /// `amount_due` is only the net difference. Reschedule quotes read this
    /// as the lineage's paid value.
    pub trip_price: Amount,
    pub payment_deadline: Option<DateTime<Utc>>,
    /// Correlation id of the in-flight mobile-money collection. `None` for
    /// agency payments.
    pub transaction_ref: Option<Uuid>,
    pub report_count: u32,
    pub supersedes: Option<String>,
    pub superseded_by: Option<String>,
    pub closed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Generates a fresh human-readable booking reference.
    pub fn fresh_number() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("BK-{}", id[..8].to_uppercase())
    }
}
