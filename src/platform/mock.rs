//! # Mock Collaborators
//!
//! In-memory implementations of the platform seams for testing the manager without a
//! store.
//!
//! | Type | Stands in for | Test controls |
//! |------|---------------|---------------|
//! | [`MockPlatform`] | [`CommercePlatform`] | catalog expectations (optionally delayed), payment and finish failures, manual transaction delivery |
//! | [`MockVerifier`] | [`ReceiptVerifier`] | accept / reject, optional gate to hold verification open |
//! | [`RecordingActivator`] | [`ProductActivator`] | records activations |
//! | [`RecordingAlertHandler`] | [`AlertHandler`] | records alerts |
//!
//! # Example
//! ```ignore
//! let platform = Arc::new(MockPlatform::new());
//! platform.expect_products().return_ok(vec![Product::new("pro_upgrade", "Pro", 4_990_000, "USD")]);
//!
//! let (actor, manager) = storekit_actor::manager::new(config, platform.clone(), verifier)?;
//! tokio::spawn(actor.run());
//!
//! manager.purchase_product("pro_upgrade").await?;
//! let payment = platform.next_payment().await.unwrap();
//! platform.deliver(Transaction::purchased("tx_1", payment.product_id, b"receipt".to_vec()));
//!
//! platform.verify(); // Ensures all catalog expectations were consumed
//! ```

use super::{
    AlertHandler, CommercePlatform, PlatformError, ProductActivator, PurchaseAlert,
    ReceiptVerifier, TransactionObserver, VerificationError,
};
use crate::config::SharedSecret;
use crate::model::{Payment, Product, ProductId, ProductsResponse, Transaction};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

type CatalogResponse = (Option<Duration>, Result<ProductsResponse, PlatformError>);

// =============================================================================
// PLATFORM
// =============================================================================

/// A scripted commerce platform.
pub struct MockPlatform {
    available: bool,
    can_make_payments: AtomicBool,
    catalog_responses: Mutex<VecDeque<CatalogResponse>>,
    requested_ids: Mutex<Vec<Vec<ProductId>>>,
    payment_errors: Mutex<VecDeque<PlatformError>>,
    payments: Mutex<Vec<Payment>>,
    payments_tx: mpsc::UnboundedSender<Payment>,
    payments_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Payment>>,
    observer: Mutex<Option<TransactionObserver>>,
    finished: Mutex<Vec<Transaction>>,
    finish_errors: Mutex<VecDeque<PlatformError>>,
    restorable: Mutex<Vec<Transaction>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// An available platform that allows payments and has no expectations.
    pub fn new() -> Self {
        let (payments_tx, payments_rx) = mpsc::unbounded_channel();
        Self {
            available: true,
            can_make_payments: AtomicBool::new(true),
            catalog_responses: Mutex::new(VecDeque::new()),
            requested_ids: Mutex::new(Vec::new()),
            payment_errors: Mutex::new(VecDeque::new()),
            payments: Mutex::new(Vec::new()),
            payments_tx,
            payments_rx: tokio::sync::Mutex::new(payments_rx),
            observer: Mutex::new(None),
            finished: Mutex::new(Vec::new()),
            finish_errors: Mutex::new(VecDeque::new()),
            restorable: Mutex::new(Vec::new()),
        }
    }

    /// A host without commerce support.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn set_can_make_payments(&self, allowed: bool) {
        self.can_make_payments.store(allowed, Ordering::SeqCst);
    }

    /// Expects a `request_products` call.
    pub fn expect_products(&self) -> ProductsExpectationBuilder<'_> {
        ProductsExpectationBuilder {
            platform: self,
            delay: None,
        }
    }

    /// Makes the next `submit_payment` call fail.
    pub fn fail_next_payment(&self, error: PlatformError) {
        self.payment_errors.lock().unwrap().push_back(error);
    }

    /// Waits for the next payment submitted to the platform.
    pub async fn next_payment(&self) -> Option<Payment> {
        self.payments_rx.lock().await.recv().await
    }

    /// Every payment submitted so far.
    pub fn payments(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }

    /// Identifier sets passed to each `request_products` call.
    pub fn requested_ids(&self) -> Vec<Vec<ProductId>> {
        self.requested_ids.lock().unwrap().clone()
    }

    /// Pushes a transaction update to the manager, as the store would.
    ///
    /// # Panics
    /// If the manager never registered an observer.
    pub fn deliver(&self, transaction: Transaction) -> bool {
        let observer = self.observer.lock().unwrap().clone();
        observer
            .expect("No transaction observer registered")
            .transaction_updated(transaction)
    }

    /// Makes the next `finish_transaction` call fail. The transaction is not recorded
    /// as finished.
    pub fn fail_next_finish(&self, error: PlatformError) {
        self.finish_errors.lock().unwrap().push_back(error);
    }

    /// Transactions the manager has finished.
    pub fn finished_transactions(&self) -> Vec<Transaction> {
        self.finished.lock().unwrap().clone()
    }

    /// Queues a transaction to be replayed by `restore_completed_transactions`.
    pub fn add_restorable(&self, transaction: Transaction) {
        self.restorable.lock().unwrap().push(transaction);
    }

    /// Verifies that all catalog expectations were consumed.
    pub fn verify(&self) {
        let remaining = self.catalog_responses.lock().unwrap().len();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

/// Builder for `request_products` expectations.
pub struct ProductsExpectationBuilder<'a> {
    platform: &'a MockPlatform,
    delay: Option<Duration>,
}

impl ProductsExpectationBuilder<'_> {
    /// Holds the response for `delay` before returning it.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the given products, all identifiers valid.
    pub fn return_ok(self, products: Vec<Product>) {
        self.return_response(ProductsResponse {
            products,
            invalid_identifiers: Vec::new(),
        });
    }

    pub fn return_response(self, response: ProductsResponse) {
        self.platform
            .catalog_responses
            .lock()
            .unwrap()
            .push_back((self.delay, Ok(response)));
    }

    pub fn return_err(self, error: PlatformError) {
        self.platform
            .catalog_responses
            .lock()
            .unwrap()
            .push_back((self.delay, Err(error)));
    }
}

#[async_trait]
impl CommercePlatform for MockPlatform {
    fn is_available(&self) -> bool {
        self.available
    }

    fn can_make_payments(&self) -> bool {
        self.can_make_payments.load(Ordering::SeqCst)
    }

    fn observe_transactions(&self, observer: TransactionObserver) {
        *self.observer.lock().unwrap() = Some(observer);
    }

    async fn request_products(&self, ids: Vec<ProductId>) -> Result<ProductsResponse, PlatformError> {
        self.requested_ids.lock().unwrap().push(ids);
        let response = self.catalog_responses.lock().unwrap().pop_front();
        match response {
            Some((delay, result)) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(PlatformError::Transport(
                "unexpected request_products".to_string(),
            )),
        }
    }

    async fn submit_payment(&self, payment: Payment) -> Result<(), PlatformError> {
        let error = self.payment_errors.lock().unwrap().pop_front();
        if let Some(error) = error {
            return Err(error);
        }
        self.payments.lock().unwrap().push(payment.clone());
        let _ = self.payments_tx.send(payment);
        Ok(())
    }

    async fn finish_transaction(&self, transaction: Transaction) -> Result<(), PlatformError> {
        let error = self.finish_errors.lock().unwrap().pop_front();
        if let Some(error) = error {
            return Err(error);
        }
        self.finished.lock().unwrap().push(transaction);
        Ok(())
    }

    async fn restore_completed_transactions(&self) -> Result<(), PlatformError> {
        let transactions = self.restorable.lock().unwrap().clone();
        let observer = self.observer.lock().unwrap().clone();
        match observer {
            Some(observer) => {
                observer.transactions_updated(transactions);
                Ok(())
            }
            None => Err(PlatformError::Transport("no observer".to_string())),
        }
    }
}

// =============================================================================
// VERIFIER
// =============================================================================

/// A receipt verifier with a fixed outcome.
pub struct MockVerifier {
    outcome: Result<(), VerificationError>,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<(Transaction, String)>>,
}

impl MockVerifier {
    pub fn accepting() -> Self {
        Self {
            outcome: Ok(()),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(VerificationError::Invalid(reason.into())),
            ..Self::accepting()
        }
    }

    /// Holds every verification until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Lets `n` held verifications complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Transactions verified so far, with the secret each was verified with.
    pub fn calls(&self) -> Vec<(Transaction, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptVerifier for MockVerifier {
    async fn verify(
        &self,
        transaction: &Transaction,
        shared_secret: &SharedSecret,
    ) -> Result<(), VerificationError> {
        self.calls
            .lock()
            .unwrap()
            .push((transaction.clone(), shared_secret.expose().to_string()));
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.outcome.clone()
    }
}

// =============================================================================
// APP-SIDE CALLBACKS
// =============================================================================

/// Activator that records every activation.
pub struct RecordingActivator {
    ids: Vec<ProductId>,
    activations: Mutex<Vec<ProductId>>,
}

impl RecordingActivator {
    pub fn new<I, P>(ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProductId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            activations: Mutex::new(Vec::new()),
        }
    }

    pub fn activations(&self) -> Vec<ProductId> {
        self.activations.lock().unwrap().clone()
    }

    pub fn activation_count(&self, id: &str) -> usize {
        self.activations
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == id)
            .count()
    }
}

impl ProductActivator for RecordingActivator {
    fn product_identifiers(&self) -> Vec<ProductId> {
        self.ids.clone()
    }

    fn activate(&self, product_id: &ProductId) {
        self.activations.lock().unwrap().push(product_id.clone());
    }
}

/// Alert handler that records every alert.
#[derive(Default)]
pub struct RecordingAlertHandler {
    alerts: Mutex<Vec<PurchaseAlert>>,
}

impl RecordingAlertHandler {
    pub fn alerts(&self) -> Vec<PurchaseAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertHandler for RecordingAlertHandler {
    fn show_alert(&self, alert: PurchaseAlert) {
        self.alerts.lock().unwrap().push(alert);
    }
}
