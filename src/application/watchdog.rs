use crate::application::reservations::ReservationEngine;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodic sweep that expires bookings whose payment deadline elapsed
/// before confirmation.
///
/// Runs concurrently with user-driven confirmations; the engine's
/// compare-and-swap transitions make whichever side reaches a booking first
/// the winner, and the watchdog silently skips the bookings it loses.
pub struct ExpiryWatchdog {
    engine: Arc<ReservationEngine>,
    every: Duration,
}

impl ExpiryWatchdog {
    pub fn new(engine: Arc<ReservationEngine>, every: Duration) -> Self {
        Self { engine, every }
    }

    /// Spawns the sweep loop onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.engine.sweep_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(swept) => tracing::info!(swept, "expired unpaid bookings"),
                    Err(err) => tracing::error!(%err, "expiry sweep failed"),
                }
            }
        })
    }
}
