//! Error types reported by the platform collaborators.

use thiserror::Error;

/// Errors returned by a [`CommercePlatform`](super::CommercePlatform).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// Commerce is not supported on this host.
    #[error("Commerce platform unavailable")]
    Unavailable,

    /// The store could not be reached.
    #[error("Platform transport error: {0}")]
    Transport(String),

    /// The store refused the request.
    #[error("Rejected by platform: {0}")]
    Rejected(String),
}

/// Errors returned by a [`ReceiptVerifier`](super::ReceiptVerifier).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VerificationError {
    #[error("Transaction carries no receipt")]
    MissingReceipt,

    #[error("Receipt rejected: {0}")]
    Invalid(String),

    #[error("Verification service error: {0}")]
    Service(String),
}
