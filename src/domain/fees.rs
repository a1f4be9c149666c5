use crate::domain::booking::{Booking, Trip};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reschedule ("report") policy, externally configured and read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPolicy {
    pub first_report_free: bool,
    /// Fee for the second reschedule, minor currency unit.
    pub second_report_fee: u64,
    /// Fee for the third and any later allowed reschedule.
    pub third_report_fee: u64,
    pub max_reports_allowed: u32,
    pub min_hours_before_departure: i64,
    pub max_days_in_future: i64,
}

/// Wire shape of the persisted settings document.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDocument {
    pub key: String,
    pub value: ReportPolicy,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyViolation {
    #[error("reschedule {ordinal} exceeds the allowed maximum of {max}")]
    TooManyReports { ordinal: u32, max: u32 },
    #[error("departure is less than {min_hours}h away")]
    TooLate { min_hours: i64 },
    #[error("new trip is more than {max_days} days ahead")]
    TooFarAhead { max_days: i64 },
}

/// Priced breakdown of a reschedule. The fee is always stated separately
/// from the price difference so the breakdown stays auditable; it is never
/// netted against a credit silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuote {
    pub fee: u64,
    /// New trip price minus the value already paid on the lineage. Signed.
    pub price_diff: i64,
    /// `price_diff + fee`. Positive: the traveler pays; negative or zero:
    /// a credit or exact match, no payment outstanding.
    pub net_amount: i64,
    pub report_ordinal: u32,
}

/// Prices a reschedule of `booking` onto `new_trip`. Pure function of the
/// booking history, the policy and the clock; no I/O.
pub fn quote(
    booking: &Booking,
    new_trip: &Trip,
    policy: &ReportPolicy,
    now: DateTime<Utc>,
) -> Result<ReportQuote, PolicyViolation> {
    let report_ordinal = booking.report_count + 1;
    if report_ordinal > policy.max_reports_allowed {
        return Err(PolicyViolation::TooManyReports {
            ordinal: report_ordinal,
            max: policy.max_reports_allowed,
        });
    }
    if booking.trip.departure - now < Duration::hours(policy.min_hours_before_departure) {
        return Err(PolicyViolation::TooLate {
            min_hours: policy.min_hours_before_departure,
        });
    }
    if new_trip.departure - now > Duration::days(policy.max_days_in_future) {
        return Err(PolicyViolation::TooFarAhead {
            max_days: policy.max_days_in_future,
        });
    }

    let fee = if report_ordinal == 1 && policy.first_report_free {
        0
    } else if report_ordinal == 2 {
        policy.second_report_fee
    } else {
        policy.third_report_fee
    };

    let price_diff = new_trip.price.signed() - booking.trip_price.signed();
    let net_amount = price_diff + fee as i64;

    Ok(ReportQuote {
        fee,
        price_diff,
        net_amount,
        report_ordinal,
    })
}
