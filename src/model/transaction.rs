use crate::model::ProductId;
use chrono::{DateTime, Utc};
use std::fmt;

/// Platform-assigned transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Resolution state of a transaction as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Submitted, awaiting the store.
    Purchasing,
    Purchased,
    Failed,
    /// Replayed from a previous purchase.
    Restored,
}

impl TransactionState {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionState::Purchasing => "Purchasing",
            TransactionState::Purchased => "Purchased",
            TransactionState::Failed => "Failed",
            TransactionState::Restored => "Restored",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request to buy a product.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Opaque data attached to the request, echoed back on the transaction.
    pub request_data: Option<Vec<u8>>,
}

impl Payment {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: 1,
            request_data: None,
        }
    }
}

/// Error attached to a failed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionError {
    pub message: String,
    /// The user dismissed the payment sheet.
    pub cancelled: bool,
}

/// Platform record of a purchase attempt and its resolution state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Option<TransactionId>,
    pub date: Option<DateTime<Utc>>,
    pub state: TransactionState,
    /// Opaque receipt blob, forwarded to the verifier.
    pub receipt: Option<Vec<u8>>,
    pub payment: Payment,
    pub error: Option<TransactionError>,
}

impl Transaction {
    pub fn new(payment: Payment, state: TransactionState) -> Self {
        Self {
            id: None,
            date: None,
            state,
            receipt: None,
            payment,
            error: None,
        }
    }

    /// A completed purchase carrying an identifier, a timestamp and a receipt.
    pub fn purchased(
        id: impl Into<TransactionId>,
        product_id: impl Into<ProductId>,
        receipt: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            date: Some(Utc::now()),
            state: TransactionState::Purchased,
            receipt: Some(receipt.into()),
            payment: Payment::new(product_id),
            error: None,
        }
    }

    pub fn restored(
        id: impl Into<TransactionId>,
        product_id: impl Into<ProductId>,
        receipt: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            state: TransactionState::Restored,
            ..Self::purchased(id, product_id, receipt)
        }
    }

    pub fn failed(product_id: impl Into<ProductId>, message: impl Into<String>, cancelled: bool) -> Self {
        Self {
            error: Some(TransactionError {
                message: message.into(),
                cancelled,
            }),
            ..Self::new(Payment::new(product_id), TransactionState::Failed)
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.payment.product_id
    }
}
