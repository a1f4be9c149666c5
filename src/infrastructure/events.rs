use crate::domain::events::BookingEvent;
use crate::domain::ports::EventSink;
use async_trait::async_trait;

/// Event sink that traces each lifecycle event. Stands in for the external
/// notification/email pipeline, which consumes the same payloads.
#[derive(Default, Clone)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: BookingEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(%payload, "booking event"),
            Err(err) => tracing::warn!(%err, "unserializable booking event"),
        }
    }
}
