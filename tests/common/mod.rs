use async_trait::async_trait;
use chrono::{Duration, Utc};
use gobus::application::reservations::{BookingRequest, ReservationEngine};
use gobus::config::BookingConfig;
use gobus::domain::booking::{Amount, PaymentMethod, Trip};
use gobus::domain::events::BookingEvent;
use gobus::domain::fees::ReportPolicy;
use gobus::domain::payment::{PaymentTransaction, TransactionStatus};
use gobus::domain::ports::{EventSink, PaymentGateway};
use gobus::error::{BookingError, Result};
use gobus::infrastructure::in_memory::InMemoryBookingStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Scriptable in-process gateway. New collections start `Pending`; tests
/// resolve or fail them by correlation id and can count calls.
#[derive(Default, Clone)]
pub struct FakeGateway {
    pub request_calls: Arc<AtomicUsize>,
    pub status_calls: Arc<AtomicUsize>,
    error_on_status: Arc<AtomicBool>,
    error_on_request: Arc<AtomicBool>,
    transactions: Arc<Mutex<HashMap<Uuid, PaymentTransaction>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&self, id: Uuid) {
        let mut txs = self.transactions.lock().await;
        let tx = txs.get_mut(&id).expect("unknown transaction");
        tx.status = TransactionStatus::Successful;
    }

    pub async fn fail(&self, id: Uuid, reason: &str) {
        let mut txs = self.transactions.lock().await;
        let tx = txs.get_mut(&id).expect("unknown transaction");
        tx.status = TransactionStatus::Failed;
        tx.reason = Some(reason.to_string());
    }

    pub fn break_status_endpoint(&self) {
        self.error_on_status.store(true, Ordering::SeqCst);
    }

    pub fn break_request_endpoint(&self) {
        self.error_on_request.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn request_to_pay(
        &self,
        phone: &str,
        amount: Amount,
        _reference: &str,
        _note: &str,
    ) -> Result<PaymentTransaction> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if self.error_on_request.load(Ordering::SeqCst) {
            return Err(BookingError::Gateway {
                status: Some(503),
                message: "gateway unavailable".to_string(),
            });
        }
        let tx = PaymentTransaction {
            id: Uuid::new_v4(),
            status: TransactionStatus::Pending,
            amount: amount.value(),
            currency: "XAF".to_string(),
            payer_phone: Some(phone.to_string()),
            reason: None,
        };
        self.transactions.lock().await.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn transaction_status(&self, id: Uuid) -> Result<PaymentTransaction> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.error_on_status.load(Ordering::SeqCst) {
            return Err(BookingError::Gateway {
                status: Some(503),
                message: "gateway unavailable".to_string(),
            });
        }
        let txs = self.transactions.lock().await;
        txs.get(&id).cloned().ok_or_else(|| BookingError::Gateway {
            status: Some(404),
            message: format!("unknown correlation id {id}"),
        })
    }
}

#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<BookingEvent>>>,
}

impl RecordingSink {
    pub async fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: BookingEvent) {
        self.events.lock().await.push(event);
    }
}

pub fn policy() -> ReportPolicy {
    ReportPolicy {
        first_report_free: true,
        second_report_fee: 2000,
        third_report_fee: 5000,
        max_reports_allowed: 3,
        min_hours_before_departure: 6,
        max_days_in_future: 30,
    }
}

pub struct Harness {
    pub engine: Arc<ReservationEngine>,
    pub store: InMemoryBookingStore,
    pub gateway: FakeGateway,
    pub sink: RecordingSink,
}

pub fn harness() -> Harness {
    let store = InMemoryBookingStore::new();
    let gateway = FakeGateway::new();
    let sink = RecordingSink::default();
    let engine = Arc::new(ReservationEngine::new(
        Box::new(store.clone()),
        Box::new(gateway.clone()),
        Box::new(sink.clone()),
        policy(),
        BookingConfig::default(),
    ));
    Harness {
        engine,
        store,
        gateway,
        sink,
    }
}

pub fn trip(price: u64, hours_to_departure: i64) -> Trip {
    Trip {
        trip_id: format!("T-{hours_to_departure}"),
        departure: Utc::now() + Duration::hours(hours_to_departure),
        price: Amount::new(price).unwrap(),
    }
}

pub fn momo_request(price: u64, hours_to_departure: i64) -> BookingRequest {
    BookingRequest {
        trip: trip(price, hours_to_departure),
        payment_method: PaymentMethod::MobileMoney {
            provider: "mtn".to_string(),
            phone: "237670001122".to_string(),
        },
    }
}

pub fn agency_request(price: u64, hours_to_departure: i64) -> BookingRequest {
    BookingRequest {
        trip: trip(price, hours_to_departure),
        payment_method: PaymentMethod::Agency {
            code: "AG-552".to_string(),
        },
    }
}
