//! Collaborator seams of the manager.
//!
//! The manager never talks to a store SDK directly. Hosts implement
//! [`CommercePlatform`] over their store (StoreKit, Play Billing, a test double)
//! and [`ReceiptVerifier`] over whatever service checks receipts with the shared
//! secret. [`ProductActivator`] and [`AlertHandler`] are the app-side callbacks.
//!
//! See [`mock`] for in-memory implementations used by the tests.

pub mod error;
pub mod mock;
pub mod observer;

pub use error::*;
pub use observer::TransactionObserver;

use crate::config::SharedSecret;
use crate::model::{Payment, ProductId, ProductsResponse, Transaction};
use async_trait::async_trait;

/// The store the manager proxies.
///
/// Asynchronous methods are always called from tasks spawned by the manager, never
/// from inside its event loop, so an implementation may take as long as the store does.
#[async_trait]
pub trait CommercePlatform: Send + Sync + 'static {
    /// Whether commerce is supported on this host at all.
    fn is_available(&self) -> bool;

    /// Purchase authorization state (parental controls, device policy).
    fn can_make_payments(&self) -> bool;

    /// Registers the sink for transaction state changes.
    ///
    /// Called once when the manager starts. The platform must deliver every
    /// transaction update, including ones for purchases started in a previous session.
    fn observe_transactions(&self, observer: TransactionObserver);

    /// Fetches descriptors for the given identifiers.
    async fn request_products(&self, ids: Vec<ProductId>) -> Result<ProductsResponse, PlatformError>;

    /// Queues a payment. Resolution arrives later through the observer.
    async fn submit_payment(&self, payment: Payment) -> Result<(), PlatformError>;

    /// Removes a resolved transaction from the platform queue.
    async fn finish_transaction(&self, transaction: Transaction) -> Result<(), PlatformError>;

    /// Replays completed transactions as `Restored` updates through the observer.
    async fn restore_completed_transactions(&self) -> Result<(), PlatformError>;
}

/// Out-of-process receipt check.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync + 'static {
    async fn verify(
        &self,
        transaction: &Transaction,
        shared_secret: &SharedSecret,
    ) -> Result<(), VerificationError>;
}

/// Unlocks content once a purchase of one of its products is verified.
pub trait ProductActivator: Send + Sync {
    /// Products this activator is responsible for.
    fn product_identifiers(&self) -> Vec<ProductId>;

    fn activate(&self, product_id: &ProductId);
}

/// Purchase-related prompts the host should present.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseAlert {
    PaymentFailed { product_id: ProductId, message: String },
    VerificationFailed { product_id: ProductId },
}

pub trait AlertHandler: Send + Sync {
    fn show_alert(&self, alert: PurchaseAlert);
}
