use crate::domain::booking::{Amount, Booking, BookingStatus};
use crate::domain::events::BookingEvent;
use crate::domain::payment::PaymentTransaction;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Collection client for the external mobile-money gateway. Knows nothing
/// about bookings; the correlation id it returns is the only link.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Fires an asynchronous request-to-pay and returns the pending
    /// transaction. Success or failure only surfaces on a later
    /// `transaction_status` poll.
    async fn request_to_pay(
        &self,
        phone: &str,
        amount: Amount,
        reference: &str,
        note: &str,
    ) -> Result<PaymentTransaction>;

    /// Polls the gateway by correlation id. Safe to call arbitrarily often;
    /// a terminal status never reverts to pending.
    async fn transaction_status(&self, id: Uuid) -> Result<PaymentTransaction>;
}

/// Booking persistence with compare-and-swap update discipline.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<()>;

    async fn get(&self, booking_number: &str) -> Result<Option<Booking>>;

    /// Commits `booking` only if the stored status still equals `expected`;
    /// a lost race yields `InvalidStateError` with nothing changed.
    async fn update_if(&self, expected: BookingStatus, booking: Booking) -> Result<Booking>;

    /// Applies the reschedule pair in one atomic unit: the old booking's
    /// terminalization and the new booking's insert. A reader must never
    /// observe one without the other.
    async fn commit_reschedule(&self, old: Booking, new: Booking) -> Result<()>;

    /// Bookings still awaiting payment whose deadline has elapsed.
    async fn expiring(&self, now: DateTime<Utc>) -> Result<Vec<Booking>>;
}

/// Consumer of lifecycle events (notifications, email). Fire-and-forget:
/// adapters swallow and report their own failures.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: BookingEvent);
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type BookingStoreBox = Box<dyn BookingStore>;
pub type EventSinkBox = Box<dyn EventSink>;
