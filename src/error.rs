use crate::domain::booking::BookingStatus;
use crate::domain::fees::PolicyViolation;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookingError>;

#[derive(Error, Debug)]
pub enum BookingError {
    /// Credential exchange with the payment gateway failed. Surfaced to the
    /// operator; never retried automatically.
    #[error("gateway authentication failed: {0}")]
    Auth(String),

    /// Network failure or non-2xx response from the payment gateway.
    /// Recoverable: the caller retries at the next poll or user action.
    #[error("gateway error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Gateway { status: Option<u16>, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    /// The booking was not in the state the transition expected. Normal
    /// outcome under concurrent confirm/expire, not a system fault.
    #[error("booking {booking_number} is {status} and cannot take this transition")]
    InvalidState {
        booking_number: String,
        status: BookingStatus,
    },

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("unknown booking: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl BookingError {
    pub fn invalid_state(booking_number: impl Into<String>, status: BookingStatus) -> Self {
        Self::InvalidState {
            booking_number: booking_number.into(),
            status,
        }
    }

    /// True when the error is a lost status race rather than a fault.
    pub fn is_state_race(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
