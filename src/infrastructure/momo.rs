use crate::config::GatewayConfig;
use crate::domain::booking::Amount;
use crate::domain::payment::{PaymentTransaction, TransactionStatus};
use crate::domain::ports::PaymentGateway;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Margin subtracted from the gateway's stated token lifetime so we never
/// race the gateway's own clock.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Overall timeout applied to every gateway call; a timed-out request
/// surfaces as a recoverable gateway error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cached bearer credential. Process-wide, short-lived, never persisted.
struct GatewayCredential {
    access_token: String,
    expires_at: Instant,
}

impl GatewayCredential {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Client for the mobile-money collection API.
///
/// The protocol is fire-and-poll: `request_to_pay` only submits the
/// collection, and the caller detects success or failure through later
/// `transaction_status` polls keyed by the correlation id.
pub struct MomoClient {
    http: reqwest::Client,
    config: GatewayConfig,
    credential: Mutex<Option<GatewayCredential>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestToPayBody<'a> {
    amount: String,
    currency: &'a str,
    external_id: &'a str,
    payer: Payer<'a>,
    payer_message: &'a str,
    payee_note: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payer<'a> {
    party_id_type: &'static str,
    party_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: TransactionStatus,
    amount: String,
    currency: String,
    #[serde(default)]
    #[allow(dead_code)]
    external_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl MomoClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: GatewayConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            config,
            credential: Mutex::new(None),
        })
    }

    /// Returns a valid bearer token, exchanging credentials only when the
    /// cached one has expired. The mutex is held across the exchange, so a
    /// refresh is single-flight: concurrent callers wait for the first
    /// caller's result instead of issuing duplicate token requests.
    async fn access_token(&self) -> Result<String> {
        let mut slot = self.credential.lock().await;
        if let Some(credential) = slot.as_ref()
            && credential.is_valid()
        {
            return Ok(credential.access_token.clone());
        }

        let credential = self.exchange_credentials().await?;
        let token = credential.access_token.clone();
        *slot = Some(credential);
        Ok(token)
    }

    async fn exchange_credentials(&self) -> Result<GatewayCredential> {
        let response = self
            .http
            .post(format!("{}/token", self.config.base_url))
            .basic_auth(&self.config.user_id, Some(&self.config.api_key))
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .send()
            .await
            .map_err(|e| BookingError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BookingError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BookingError::Auth(format!("malformed token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(
            TOKEN_EXPIRY_MARGIN.as_secs(),
        ));
        tracing::debug!(expires_in = token.expires_in, "gateway token refreshed");
        Ok(GatewayCredential {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

/// Strips separators and a leading `+`, then requires 8 to 15 digits.
fn normalize_phone(raw: &str) -> Result<String> {
    let digits: String = raw
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(BookingError::Validation(format!(
            "malformed payer phone number: {raw}"
        )));
    }
    Ok(digits)
}

async fn non_success(response: reqwest::Response) -> BookingError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    BookingError::Gateway {
        status: Some(status),
        message,
    }
}

#[async_trait]
impl PaymentGateway for MomoClient {
    async fn request_to_pay(
        &self,
        phone: &str,
        amount: Amount,
        reference: &str,
        note: &str,
    ) -> Result<PaymentTransaction> {
        let payer_phone = normalize_phone(phone)?;
        let token = self.access_token().await?;
        // Caller-generated correlation id, carried as a header rather than
        // in the body; it is the sole handle for later status checks.
        let correlation_id = Uuid::new_v4();

        let body = RequestToPayBody {
            amount: amount.value().to_string(),
            currency: &self.config.currency,
            external_id: reference,
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: &payer_phone,
            },
            payer_message: note,
            payee_note: note,
        };

        let sent = self
            .http
            .post(format!("{}/requesttopay", self.config.base_url))
            .bearer_auth(&token)
            .header("X-Reference-Id", correlation_id.to_string())
            .header("X-Target-Environment", &self.config.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .json(&body)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            // A lost response is not a lost payment: the gateway may have
            // accepted the collection and the payer may still approve it.
            // The correlation id already went out as a header, so report
            // the transaction as pending and let a later status poll
            // settle it.
            Err(err) if err.is_timeout() => {
                tracing::warn!(
                    %correlation_id,
                    reference,
                    "request-to-pay response lost, treating as pending"
                );
                return Ok(PaymentTransaction {
                    id: correlation_id,
                    status: TransactionStatus::Pending,
                    amount: amount.value(),
                    currency: self.config.currency.clone(),
                    payer_phone: Some(payer_phone),
                    reason: None,
                });
            }
            Err(err) => return Err(err.into()),
        };

        if !response.status().is_success() {
            return Err(non_success(response).await);
        }

        // The gateway accepts with an empty body and processes the payment
        // asynchronously on the payer's device.
        tracing::debug!(%correlation_id, reference, "request-to-pay submitted");
        Ok(PaymentTransaction {
            id: correlation_id,
            status: TransactionStatus::Pending,
            amount: amount.value(),
            currency: self.config.currency.clone(),
            payer_phone: Some(payer_phone),
            reason: None,
        })
    }

    async fn transaction_status(&self, id: Uuid) -> Result<PaymentTransaction> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/requesttopay/{id}", self.config.base_url))
            .bearer_auth(&token)
            .header("X-Target-Environment", &self.config.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(non_success(response).await);
        }

        let status: StatusResponse = response.json().await?;
        let amount = status.amount.parse::<u64>().map_err(|_| BookingError::Gateway {
            status: None,
            message: format!("unparsable amount in status response: {}", status.amount),
        })?;

        Ok(PaymentTransaction {
            id,
            status: status.status,
            amount,
            currency: status.currency,
            payer_phone: None,
            reason: status.reason,
        })
    }
}
