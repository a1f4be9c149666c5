use clap::Parser;
use gobus::application::reservations::ReservationEngine;
use gobus::application::watchdog::ExpiryWatchdog;
use gobus::config::Settings;
use gobus::domain::ports::{BookingStoreBox, EventSinkBox, PaymentGatewayBox};
use gobus::infrastructure::events::TracingEventSink;
use gobus::infrastructure::in_memory::InMemoryBookingStore;
use gobus::infrastructure::momo::MomoClient;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON settings file. Gateway secrets may also come from
    /// MOMO_SUBSCRIPTION_KEY, MOMO_USER_ID and MOMO_API_KEY.
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.settings).into_diagnostic()?;

    let store: BookingStoreBox = Box::new(InMemoryBookingStore::new());
    let gateway: PaymentGatewayBox =
        Box::new(MomoClient::new(settings.gateway.clone()).into_diagnostic()?);
    let events: EventSinkBox = Box::new(TracingEventSink);

    let engine = Arc::new(ReservationEngine::new(
        store,
        gateway,
        events,
        settings.report_policy.clone(),
        settings.booking.clone(),
    ));

    let sweep_interval = Duration::from_secs(settings.booking.sweep_interval_secs);
    let watchdog = ExpiryWatchdog::new(Arc::clone(&engine), sweep_interval).spawn();
    tracing::info!(
        interval_secs = settings.booking.sweep_interval_secs,
        "reservation core running, watchdog armed"
    );

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    tracing::info!("shutting down");
    watchdog.abort();
    Ok(())
}
