//! Error types for the purchase manager.

use crate::model::ProductId;
use thiserror::Error;

/// Errors reported by the purchase manager.
///
/// Catalog and payment failures travel inside [`PurchaseEvent`](crate::model::PurchaseEvent)s;
/// client calls only ever return [`PurchaseError::ManagerClosed`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PurchaseError {
    /// The platform could not deliver the product catalog.
    #[error("Catalog fetch failed: {0}")]
    CatalogFetchFailed(String),

    /// The store refused or failed the payment.
    #[error("Purchase rejected by platform: {message}")]
    PurchaseRejectedByPlatform { message: String, cancelled: bool },

    /// The payment went through but the receipt did not verify.
    #[error("Receipt verification failed: {0}")]
    ReceiptVerificationFailed(String),

    /// The product is not in the cached catalog.
    #[error("Unknown product identifier: {0}")]
    UnknownProductIdentifier(ProductId),

    /// Purchases are disabled on this device.
    #[error("Purchasing is not authorized on this device")]
    PurchasingUnauthorized,

    /// A purchase of this product is already in flight.
    #[error("Purchase already pending: {0}")]
    PurchaseAlreadyPending(ProductId),

    /// Commerce is not supported on this host.
    #[error("Commerce platform unavailable")]
    PlatformUnavailable,

    /// The manager's event loop has stopped.
    #[error("Purchase manager closed")]
    ManagerClosed,
}
