use gobus::config::GatewayConfig;
use gobus::domain::booking::Amount;
use gobus::domain::payment::TransactionStatus;
use gobus::domain::ports::PaymentGateway;
use gobus::error::BookingError;
use gobus::infrastructure::momo::MomoClient;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> GatewayConfig {
    serde_json::from_value(json!({
        "baseUrl": server.uri(),
        "subscriptionKey": "sub-key",
        "userId": "api-user",
        "apiKey": "api-secret",
        "targetEnvironment": "sandbox",
        "currency": "XAF"
    }))
    .unwrap()
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header_exists("Authorization"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn request_to_pay_sends_the_contract_headers_and_body() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .and(header("Authorization", "Bearer tok-123"))
        .and(header_exists("X-Reference-Id"))
        .and(header("X-Target-Environment", "sandbox"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .and(body_partial_json(json!({
            "amount": "10000",
            "currency": "XAF",
            "externalId": "BK-TEST0001",
            "payer": { "partyIdType": "MSISDN", "partyId": "237670001122" }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let tx = client
        .request_to_pay(
            "+237 670-00-11-22",
            Amount::new(10_000).unwrap(),
            "BK-TEST0001",
            "Bus seat BK-TEST0001",
        )
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount, 10_000);
    assert_eq!(tx.payer_phone.as_deref(), Some("237670001122"));
}

#[tokio::test]
async fn token_is_reused_across_calls_within_its_lifetime() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    for reference in ["BK-AAAA0001", "BK-BBBB0002"] {
        client
            .request_to_pay("237670001122", Amount::new(5_000).unwrap(), reference, "seat")
            .await
            .unwrap();
    }
    // Mock expectations verify exactly one token exchange on drop.
}

#[tokio::test]
async fn each_request_gets_a_fresh_correlation_id() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let a = client
        .request_to_pay("237670001122", Amount::new(5_000).unwrap(), "BK-A", "seat")
        .await
        .unwrap();
    let b = client
        .request_to_pay("237670001122", Amount::new(5_000).unwrap(), "BK-B", "seat")
        .await
        .unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn status_poll_parses_a_failed_collection() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/requesttopay/{id}")))
        .and(header("Authorization", "Bearer tok-123"))
        .and(header("X-Target-Environment", "sandbox"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "amount": "10000",
            "currency": "XAF",
            "externalId": "BK-TEST0001",
            "reason": "PAYER_REJECTED"
        })))
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let tx = client.transaction_status(id).await.unwrap();
    assert_eq!(tx.id, id);
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.reason.as_deref(), Some("PAYER_REJECTED"));
}

#[tokio::test]
async fn status_poll_parses_success_without_reason() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/requesttopay/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESSFUL",
            "amount": "10000",
            "currency": "XAF",
            "externalId": "BK-TEST0001"
        })))
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let tx = client.transaction_status(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Successful);
    assert_eq!(tx.amount, 10_000);
    assert!(tx.reason.is_none());
}

#[tokio::test]
async fn non_2xx_preserves_the_gateway_status_and_message() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let err = client
        .request_to_pay("237670001122", Amount::new(5_000).unwrap(), "BK-A", "seat")
        .await
        .unwrap_err();
    match err {
        BookingError::Gateway { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "internal failure");
        }
        other => panic!("expected gateway error, got {other}"),
    }
}

#[tokio::test]
async fn bad_credentials_surface_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let client = MomoClient::new(config(&server)).unwrap();
    let err = client
        .request_to_pay("237670001122", Amount::new(5_000).unwrap(), "BK-A", "seat")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Auth(_)));
}

#[tokio::test]
async fn lost_response_reports_the_collection_as_pending() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    // The gateway accepts the collection but the response arrives after
    // the client gave up waiting.
    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .respond_with(
            ResponseTemplate::new(202).set_delay(std::time::Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client =
        MomoClient::with_timeout(config(&server), std::time::Duration::from_millis(100)).unwrap();
    let tx = client
        .request_to_pay("237670001122", Amount::new(10_000).unwrap(), "BK-A", "seat")
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn booking_survives_a_timed_out_collection_request() {
    use gobus::application::reservations::{BookingRequest, ReservationEngine};
    use gobus::config::BookingConfig;
    use gobus::domain::booking::{BookingStatus, PaymentMethod, Trip};
    use gobus::domain::fees::ReportPolicy;
    use gobus::domain::ports::BookingStore;
    use gobus::infrastructure::events::TracingEventSink;
    use gobus::infrastructure::in_memory::InMemoryBookingStore;

    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/requesttopay"))
        .respond_with(
            ResponseTemplate::new(202).set_delay(std::time::Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = InMemoryBookingStore::new();
    let client =
        MomoClient::with_timeout(config(&server), std::time::Duration::from_millis(100)).unwrap();
    let engine = ReservationEngine::new(
        Box::new(store.clone()),
        Box::new(client),
        Box::new(TracingEventSink),
        ReportPolicy {
            first_report_free: true,
            second_report_fee: 2000,
            third_report_fee: 5000,
            max_reports_allowed: 3,
            min_hours_before_departure: 6,
            max_days_in_future: 30,
        },
        BookingConfig::default(),
    );

    let booking = engine
        .create_booking(BookingRequest {
            trip: Trip {
                trip_id: "T-1".to_string(),
                departure: chrono::Utc::now() + chrono::Duration::hours(72),
                price: Amount::new(10_000).unwrap(),
            },
            payment_method: PaymentMethod::MobileMoney {
                provider: "mtn".to_string(),
                phone: "237670001122".to_string(),
            },
        })
        .await
        .unwrap();

    // The collection was accepted gateway-side; the booking exists with
    // the correlation id stored, awaiting a later status poll.
    assert_eq!(booking.status, BookingStatus::PendingPayment);
    assert!(booking.transaction_ref.is_some());
    let stored = store.get(&booking.booking_number).await.unwrap().unwrap();
    assert_eq!(stored.transaction_ref, booking.transaction_ref);
}

#[tokio::test]
async fn malformed_phone_never_reaches_the_network() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and the expectations below
    // would not hold.
    let client = MomoClient::new(config(&server)).unwrap();
    let err = client
        .request_to_pay("not-a-phone", Amount::new(5_000).unwrap(), "BK-A", "seat")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
