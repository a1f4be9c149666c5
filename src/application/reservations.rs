use crate::config::BookingConfig;
use crate::domain::booking::{Amount, Booking, BookingStatus, PaymentMethod, Trip};
use crate::domain::events::BookingEvent;
use crate::domain::fees::{self, ReportPolicy, ReportQuote};
use crate::domain::payment::TransactionStatus;
use crate::domain::ports::{BookingStoreBox, EventSinkBox, PaymentGatewayBox};
use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};

/// A booking request, after trip/seat selection has happened elsewhere.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub trip: Trip,
    pub payment_method: PaymentMethod,
}

/// Owns every booking status transition.
///
/// All transitions go through the store's compare-and-swap update, so a
/// concurrent confirm and expiry on the same booking resolve to exactly one
/// winner; the loser sees `InvalidState` and the booking is never left in a
/// corrupted intermediate state.
pub struct ReservationEngine {
    store: BookingStoreBox,
    gateway: PaymentGatewayBox,
    events: EventSinkBox,
    policy: ReportPolicy,
    config: BookingConfig,
}

impl ReservationEngine {
    pub fn new(
        store: BookingStoreBox,
        gateway: PaymentGatewayBox,
        events: EventSinkBox,
        policy: ReportPolicy,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            events,
            policy,
            config,
        }
    }

    /// Creates a booking in `PendingPayment`. For mobile-money the
    /// collection is fired before the insert and its correlation id stored
    /// on the booking; the payment itself completes asynchronously on the
    /// payer's device and is reconciled by `confirm_payment`.
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking> {
        let now = Utc::now();
        if request.trip.departure <= now {
            return Err(BookingError::Validation(
                "trip has already departed".to_string(),
            ));
        }

        let booking_number = Booking::fresh_number();
        let payment_deadline = self.payment_deadline(&request.payment_method, &request.trip, now);

        let transaction_ref = match &request.payment_method {
            PaymentMethod::MobileMoney { phone, .. } => {
                let note = format!("Bus seat {booking_number}");
                let tx = self
                    .gateway
                    .request_to_pay(phone, request.trip.price, &booking_number, &note)
                    .await?;
                Some(tx.id)
            }
            PaymentMethod::Agency { .. } => None,
        };

        let booking = Booking {
            booking_number: booking_number.clone(),
            status: BookingStatus::PendingPayment,
            payment_method: request.payment_method,
            amount_due: request.trip.price,
            trip_price: request.trip.price,
            trip: request.trip,
            payment_deadline: Some(payment_deadline),
            transaction_ref,
            report_count: 0,
            supersedes: None,
            superseded_by: None,
            closed_reason: None,
            created_at: now,
        };
        self.store.insert(booking.clone()).await?;
        tracing::info!(%booking_number, "booking created");
        Ok(booking)
    }

    /// Reconciles payment for a booking.
    ///
    /// Idempotent on an already-confirmed booking: returns it unchanged
    /// without touching the gateway. For mobile-money the gateway is polled
    /// and the booking moves to `Confirmed` on success, to `Cancelled` with
    /// the gateway's reason on failure, and stays `PendingPayment` while
    /// the collection is still pending. Agency confirmation is externally
    /// driven and unconditional. A gateway error leaves the booking
    /// untouched for a later retry.
    pub async fn confirm_payment(&self, booking_number: &str) -> Result<Booking> {
        let booking = self.fetch(booking_number).await?;
        match booking.status {
            BookingStatus::Confirmed => Ok(booking),
            BookingStatus::PendingPayment => match &booking.payment_method {
                PaymentMethod::Agency { .. } => self.commit_confirmation(booking).await,
                PaymentMethod::MobileMoney { .. } => {
                    let tx_ref = booking.transaction_ref.ok_or_else(|| {
                        BookingError::Validation(format!(
                            "booking {booking_number} has no transaction reference"
                        ))
                    })?;
                    let tx = self.gateway.transaction_status(tx_ref).await?;
                    match tx.status {
                        TransactionStatus::Pending => Ok(booking),
                        TransactionStatus::Successful => self.commit_confirmation(booking).await,
                        TransactionStatus::Failed => {
                            let reason = tx
                                .reason
                                .unwrap_or_else(|| "payment failed".to_string());
                            tracing::info!(booking_number, %reason, "collection failed");
                            self.close(booking, BookingStatus::Cancelled, Some(reason))
                                .await
                        }
                    }
                }
            },
            status => Err(BookingError::invalid_state(booking_number, status)),
        }
    }

    /// Prices a reschedule without mutating anything; the quote is advisory
    /// until `confirm_reschedule`.
    pub async fn request_reschedule(
        &self,
        booking_number: &str,
        new_trip: &Trip,
        now: DateTime<Utc>,
    ) -> Result<ReportQuote> {
        let booking = self.fetch(booking_number).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::invalid_state(booking_number, booking.status));
        }
        Ok(fees::quote(&booking, new_trip, &self.policy, now)?)
    }

    /// Executes a reschedule: the old booking ends up `Reported` and linked
    /// to a new booking, in one atomic pair commit.
    ///
    /// The old booking is first claimed (`Confirmed` -> `ReportPending`) so
    /// concurrent cancels or second reschedules lose their compare-and-swap.
    /// The policy is re-checked at confirm time; if pricing or the fresh
    /// collection request fails, the claim is released and the booking is
    /// back to `Confirmed`.
    pub async fn confirm_reschedule(
        &self,
        booking_number: &str,
        new_trip: &Trip,
    ) -> Result<(Booking, Booking)> {
        let now = Utc::now();
        let booking = self.fetch(booking_number).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::invalid_state(booking_number, booking.status));
        }

        let mut claimed = booking.clone();
        claimed.status = BookingStatus::ReportPending;
        let claimed = self
            .store
            .update_if(BookingStatus::Confirmed, claimed)
            .await?;

        match self.build_rescheduled(&claimed, new_trip, now).await {
            Ok(new_booking) => {
                let mut reported = claimed.clone();
                reported.status = BookingStatus::Reported;
                reported.superseded_by = Some(new_booking.booking_number.clone());
                if let Err(err) = self
                    .store
                    .commit_reschedule(reported.clone(), new_booking.clone())
                    .await
                {
                    self.release_claim(claimed).await;
                    return Err(err);
                }
                self.events
                    .publish(BookingEvent::BookingRescheduled {
                        old_booking_number: reported.booking_number.clone(),
                        new_booking_number: new_booking.booking_number.clone(),
                    })
                    .await;
                tracing::info!(
                    old = %reported.booking_number,
                    new = %new_booking.booking_number,
                    "booking rescheduled"
                );
                Ok((reported, new_booking))
            }
            Err(err) => {
                self.release_claim(claimed).await;
                Err(err)
            }
        }
    }

    /// Cancels a booking from any non-terminal state; idempotent when
    /// already cancelled.
    pub async fn cancel(&self, booking_number: &str, reason: &str) -> Result<Booking> {
        let booking = self.fetch(booking_number).await?;
        match booking.status {
            BookingStatus::Cancelled => Ok(booking),
            status if status.is_terminal() => {
                Err(BookingError::invalid_state(booking_number, status))
            }
            _ => {
                self.close(booking, BookingStatus::Cancelled, Some(reason.to_string()))
                    .await
            }
        }
    }

    /// One expiry sweep: every `PendingPayment` booking past its deadline
    /// moves to `Expired`. A lost race against a concurrent confirmation is
    /// logged and skipped, never retried within the sweep; a store error on
    /// one booking is logged and must not starve the rest of the sweep.
    /// Returns the number of bookings expired.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.expiring(now).await?;
        let mut swept = 0;
        for booking in due {
            let booking_number = booking.booking_number.clone();
            match self
                .close(
                    booking,
                    BookingStatus::Expired,
                    Some("payment deadline elapsed".to_string()),
                )
                .await
            {
                Ok(_) => swept += 1,
                Err(err) if err.is_state_race() => {
                    tracing::debug!(%booking_number, "expiry lost the race, skipping");
                }
                Err(err) => {
                    tracing::error!(%booking_number, %err, "failed to expire booking");
                }
            }
        }
        Ok(swept)
    }

    async fn fetch(&self, booking_number: &str) -> Result<Booking> {
        self.store
            .get(booking_number)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_number.to_string()))
    }

    fn payment_deadline(
        &self,
        method: &PaymentMethod,
        trip: &Trip,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        match method {
            // The agency window never extends past departure.
            PaymentMethod::Agency { .. } => {
                (now + Duration::hours(self.config.agency_deadline_hours)).min(trip.departure)
            }
            PaymentMethod::MobileMoney { .. } => {
                now + Duration::minutes(self.config.momo_confirm_minutes)
            }
        }
    }

    async fn commit_confirmation(&self, booking: Booking) -> Result<Booking> {
        let expected = booking.status;
        let mut confirmed = booking;
        confirmed.status = BookingStatus::Confirmed;
        confirmed.payment_deadline = None;
        let confirmed = self.store.update_if(expected, confirmed).await?;
        self.events
            .publish(BookingEvent::BookingConfirmed {
                booking_number: confirmed.booking_number.clone(),
            })
            .await;
        tracing::info!(booking_number = %confirmed.booking_number, "booking confirmed");
        Ok(confirmed)
    }

    /// Shared terminalization path for cancellation and expiry.
    async fn close(
        &self,
        booking: Booking,
        status: BookingStatus,
        reason: Option<String>,
    ) -> Result<Booking> {
        let expected = booking.status;
        let mut closed = booking;
        closed.status = status;
        closed.closed_reason = reason;
        let closed = self.store.update_if(expected, closed).await?;
        if status == BookingStatus::Expired {
            self.events
                .publish(BookingEvent::BookingExpired {
                    booking_number: closed.booking_number.clone(),
                })
                .await;
        }
        Ok(closed)
    }

    async fn build_rescheduled(
        &self,
        old: &Booking,
        new_trip: &Trip,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        let quote = fees::quote(old, new_trip, &self.policy, now)?;
        let booking_number = Booking::fresh_number();

        let (status, amount_due, payment_deadline, transaction_ref) = if quote.net_amount <= 0 {
            // Credit or exact match: nothing outstanding, the new booking
            // is confirmed immediately. Any credit is carried by the quote
            // for the external settlement process.
            (
                BookingStatus::Confirmed,
                new_trip.price,
                None,
                None,
            )
        } else {
            let due = Amount::new(quote.net_amount as u64)?;
            let deadline = self.payment_deadline(&old.payment_method, new_trip, now);
            let tx_ref = match &old.payment_method {
                PaymentMethod::MobileMoney { phone, .. } => {
                    let note = format!("Reschedule {booking_number}");
                    let tx = self
                        .gateway
                        .request_to_pay(phone, due, &booking_number, &note)
                        .await?;
                    Some(tx.id)
                }
                PaymentMethod::Agency { .. } => None,
            };
            (
                BookingStatus::PendingPayment,
                due,
                Some(deadline),
                tx_ref,
            )
        };

        Ok(Booking {
            booking_number,
            status,
            payment_method: old.payment_method.clone(),
            trip: new_trip.clone(),
            amount_due,
            trip_price: new_trip.price,
            payment_deadline,
            transaction_ref,
            report_count: old.report_count + 1,
            supersedes: Some(old.booking_number.clone()),
            superseded_by: None,
            closed_reason: None,
            created_at: now,
        })
    }

    async fn release_claim(&self, claimed: Booking) {
        let booking_number = claimed.booking_number.clone();
        let mut restored = claimed;
        restored.status = BookingStatus::Confirmed;
        if let Err(err) = self
            .store
            .update_if(BookingStatus::ReportPending, restored)
            .await
        {
            tracing::warn!(%booking_number, %err, "failed to release reschedule claim");
        }
    }
}
