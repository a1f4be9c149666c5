use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::ports::BookingStore;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory booking store.
///
/// Uses `Arc<RwLock<HashMap<String, Booking>>>` for shared concurrent
/// access. The single write lock is what makes `update_if` a true
/// compare-and-swap and `commit_reschedule` atomic; a database adapter
/// would use a conditional update and a transaction instead.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<String, Booking>>>,
}

impl InMemoryBookingStore {
    /// Creates a new, empty in-memory booking store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.booking_number) {
            return Err(BookingError::Validation(format!(
                "duplicate booking number {}",
                booking.booking_number
            )));
        }
        bookings.insert(booking.booking_number.clone(), booking);
        Ok(())
    }

    async fn get(&self, booking_number: &str) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(booking_number).cloned())
    }

    async fn update_if(&self, expected: BookingStatus, booking: Booking) -> Result<Booking> {
        let mut bookings = self.bookings.write().await;
        let current = bookings
            .get(&booking.booking_number)
            .ok_or_else(|| BookingError::NotFound(booking.booking_number.clone()))?;
        if current.status != expected {
            return Err(BookingError::invalid_state(
                &booking.booking_number,
                current.status,
            ));
        }
        bookings.insert(booking.booking_number.clone(), booking.clone());
        Ok(booking)
    }

    async fn commit_reschedule(&self, old: Booking, new: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let current = bookings
            .get(&old.booking_number)
            .ok_or_else(|| BookingError::NotFound(old.booking_number.clone()))?;
        // The engine claims the old booking as ReportPending before the
        // pair commit; anything else means the claim was lost.
        if current.status != BookingStatus::ReportPending {
            return Err(BookingError::invalid_state(
                &old.booking_number,
                current.status,
            ));
        }
        if bookings.contains_key(&new.booking_number) {
            return Err(BookingError::Validation(format!(
                "duplicate booking number {}",
                new.booking_number
            )));
        }
        bookings.insert(old.booking_number.clone(), old);
        bookings.insert(new.booking_number.clone(), new);
        Ok(())
    }

    async fn expiring(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::PendingPayment
                    && b.payment_deadline.is_some_and(|d| d < now)
            })
            .cloned()
            .collect())
    }
}
