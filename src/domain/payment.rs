use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a collection on the gateway side. A terminal status is never
/// left; only `Pending` can change on a later poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Successful,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A request-to-pay transaction as seen through the gateway client.
///
/// The `id` is the caller-generated correlation id; it is the sole handle
/// for later status checks. Linked to a booking by reference
/// (`Booking::transaction_ref`), never embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub status: TransactionStatus,
    pub amount: u64,
    pub currency: String,
    /// Known at submission time; the gateway's status response does not
    /// echo it back.
    pub payer_phone: Option<String>,
    /// Gateway-supplied failure reason, present on `Failed`.
    pub reason: Option<String>,
}
