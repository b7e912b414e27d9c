//! # Purchase Actor
//!
//! The event loop that owns every piece of mutable manager state: the product catalog,
//! the activator registry, the pending-purchase table and the alert handler.
//!
//! **Concurrency Model**:
//! The loop is the single point of serialization. Platform work (catalog queries,
//! payment submission, receipt verification, finishing transactions) runs in spawned
//! tasks whose results are posted back as [`PlatformUpdate`]s, so a catalog refresh
//! completing and a purchase being submitted can never race. No `Mutex` is needed.
//!
//! Readers of the catalog never go through the loop: the actor publishes immutable
//! snapshots on a `watch` channel.
//!
//! ## Flow of a purchase
//!
//! ```text
//! Client                Actor                         Spawned task / Platform
//!   | Purchase(pro)       |                                   |
//!   |-------------------->| pending[pro] = Submitted          |
//!   |                     | emit purchase-started             |
//!   |                     |---- submit_payment -------------->|
//!   |                     |<--- TransactionUpdated(Purchased) |
//!   |                     | pending[pro] = Verifying          |
//!   |                     |---- verifier.verify ------------->|
//!   |                     |<--- VerificationCompleted(Ok)     |
//!   |                     | activate(pro)                     |
//!   |                     | emit payment-success              |
//!   |                     | resolved[tx] = Finishing          |
//!   |                     |---- finish_transaction ---------->|
//!   |                     | emit purchase-finished            |
//!   |                     |<--- TransactionFinished(tx)       |
//!   |                     | resolved[tx] = Finished           |
//! ```
//!
//! ## Transaction identity
//!
//! A transaction is tracked under its platform identifier, or under its product id
//! when the platform did not assign one. Once resolved, an identified transaction
//! stays in the resolved ledger for the life of the actor, so a redelivery never
//! produces a second terminal event or a second activation. If finishing fails, the
//! next redelivery only retries the finish. Transactions without an identifier
//! cannot be told apart from the next purchase of the same product and are only
//! deduplicated while their receipt is being checked.
//!
//! Pending purchases are keyed by product id. Only `Purchasing`, `Purchased` and
//! `Failed` updates advance them; `Restored` transactions never belong to a purchase
//! started in this session.
//!
//! ## Catalog refreshes
//!
//! Each refresh carries a sequence number. Overlapping refreshes all report their
//! events, but the cache only moves forward: a response older than the one already
//! applied is not published.

use super::error::PurchaseError;
use super::message::{ManagerRequest, PlatformUpdate, TransactionKey};
use super::registry::ActivatorRegistry;
use crate::config::SharedSecret;
use crate::diagnostics::log_transaction;
use crate::model::{
    Payment, ProductCatalog, ProductId, ProductsResponse, PurchaseEvent, Transaction,
    TransactionState,
};
use crate::platform::{
    AlertHandler, CommercePlatform, PlatformError, PurchaseAlert, ReceiptVerifier,
    VerificationError,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Where an in-flight purchase currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PurchaseState {
    /// Handed to the platform, no transaction seen yet.
    Submitted,
    /// The platform reported the transaction as purchasing.
    Purchasing,
    /// Purchased, receipt check running.
    Verifying,
}

#[derive(Debug, Clone)]
struct PendingPurchase {
    state: PurchaseState,
    started_at: DateTime<Utc>,
}

/// Where a resolved transaction stands with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishState {
    /// `finish_transaction` is running.
    Finishing,
    /// The platform refused to finish it; the next redelivery retries.
    FinishFailed,
    /// Acknowledged by the platform.
    Finished,
}

/// Owns the manager state. Built by [`new`](super::new), driven by [`run`](Self::run).
pub struct PurchaseActor {
    receiver: mpsc::Receiver<ManagerRequest>,
    updates: mpsc::UnboundedReceiver<PlatformUpdate>,
    updates_tx: mpsc::UnboundedSender<PlatformUpdate>,
    platform: Arc<dyn CommercePlatform>,
    verifier: Arc<dyn ReceiptVerifier>,
    shared_secret: SharedSecret,
    configured_ids: Vec<ProductId>,
    activators: ActivatorRegistry,
    alert_handler: Option<Arc<dyn AlertHandler>>,
    pending: HashMap<ProductId, PendingPurchase>,
    verifying: HashSet<TransactionKey>,
    resolved: HashMap<TransactionKey, FinishState>,
    catalog: watch::Sender<Arc<ProductCatalog>>,
    /// Sequence of the last refresh issued.
    refresh_seq: u64,
    /// Sequence of the response currently published in `catalog`.
    applied_seq: u64,
    events: broadcast::Sender<PurchaseEvent>,
    in_flight: usize,
    requests_closed: bool,
}

/// Channels and collaborators the actor is assembled from.
pub(crate) struct ActorParts {
    pub receiver: mpsc::Receiver<ManagerRequest>,
    pub updates: mpsc::UnboundedReceiver<PlatformUpdate>,
    pub updates_tx: mpsc::UnboundedSender<PlatformUpdate>,
    pub platform: Arc<dyn CommercePlatform>,
    pub verifier: Arc<dyn ReceiptVerifier>,
    pub shared_secret: SharedSecret,
    pub configured_ids: Vec<ProductId>,
    pub catalog: watch::Sender<Arc<ProductCatalog>>,
    pub events: broadcast::Sender<PurchaseEvent>,
}

impl PurchaseActor {
    pub(crate) fn new(parts: ActorParts) -> Self {
        Self {
            receiver: parts.receiver,
            updates: parts.updates,
            updates_tx: parts.updates_tx,
            platform: parts.platform,
            verifier: parts.verifier,
            shared_secret: parts.shared_secret,
            configured_ids: parts.configured_ids,
            activators: ActivatorRegistry::default(),
            alert_handler: None,
            pending: HashMap::new(),
            verifying: HashSet::new(),
            resolved: HashMap::new(),
            catalog: parts.catalog,
            refresh_seq: 0,
            applied_seq: 0,
            events: parts.events,
            in_flight: 0,
            requests_closed: false,
        }
    }

    /// Runs the event loop.
    ///
    /// The loop ends once every client handle is dropped and every spawned platform
    /// task has reported back. Purchases still waiting on a platform callback at that
    /// point are abandoned.
    pub async fn run(mut self) {
        info!("Purchase manager started");

        loop {
            if self.requests_closed && self.in_flight == 0 {
                break;
            }
            tokio::select! {
                request = self.receiver.recv(), if !self.requests_closed => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        debug!(in_flight = self.in_flight, "All handles dropped, draining");
                        self.requests_closed = true;
                    }
                },
                Some(update) = self.updates.recv() => {
                    if update.completes_task() {
                        self.in_flight = self.in_flight.saturating_sub(1);
                    }
                    self.handle_update(update);
                }
            }
        }

        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "Shutdown with unresolved purchases");
        }
        info!(products = self.catalog.borrow().len(), "Shutdown");
    }

    fn handle_request(&mut self, request: ManagerRequest) {
        match request {
            ManagerRequest::AddActivator { activator } => {
                let ids = activator.product_identifiers();
                if self.activators.add(activator) {
                    info!(?ids, "Activator added");
                } else {
                    debug!(?ids, "Activator already registered");
                }
            }
            ManagerRequest::RemoveActivator { activator } => {
                if self.activators.remove(&activator) {
                    info!(remaining = self.activators.len(), "Activator removed");
                } else {
                    debug!("Activator was not registered");
                }
            }
            ManagerRequest::SetAlertHandler { handler } => {
                debug!(attached = handler.is_some(), "Alert handler set");
                self.alert_handler = handler;
            }
            ManagerRequest::UpdateProducts => self.update_products(),
            ManagerRequest::Purchase { product_id } => self.purchase(product_id),
            ManagerRequest::RestorePurchases => self.restore_purchases(),
        }
    }

    fn handle_update(&mut self, update: PlatformUpdate) {
        match update {
            PlatformUpdate::TransactionUpdated { transaction } => {
                self.on_transaction_updated(transaction)
            }
            PlatformUpdate::ProductsLoaded { seq, result } => self.on_products_loaded(seq, result),
            PlatformUpdate::SubmissionCompleted { product_id, result } => {
                self.on_submission_completed(product_id, result)
            }
            PlatformUpdate::VerificationCompleted {
                transaction,
                result,
            } => self.on_verification_completed(transaction, result),
            PlatformUpdate::TransactionFinished { key, result } => {
                self.on_transaction_finished(key, result)
            }
            PlatformUpdate::RestoreCompleted { result } => match result {
                Ok(()) => info!("Restore completed"),
                Err(e) => warn!(error = %e, "Restore failed"),
            },
        }
    }

    // --- Catalog ---

    fn update_products(&mut self) {
        let mut ids = self.activators.claimed_ids();
        ids.extend(self.configured_ids.iter().cloned());
        let ids: Vec<ProductId> = ids.into_iter().collect();

        self.refresh_seq += 1;
        let seq = self.refresh_seq;
        debug!(seq, ?ids, "Requesting products");
        self.emit(PurchaseEvent::ProductsUpdateStarted);

        let platform = self.platform.clone();
        self.spawn_task(async move {
            PlatformUpdate::ProductsLoaded {
                seq,
                result: platform.request_products(ids).await,
            }
        });
    }

    fn on_products_loaded(&mut self, seq: u64, result: Result<ProductsResponse, PlatformError>) {
        match result {
            Ok(response) => {
                if !response.invalid_identifiers.is_empty() {
                    warn!(invalid = ?response.invalid_identifiers, "Platform reported invalid product identifiers");
                }
                if seq > self.applied_seq {
                    let catalog: ProductCatalog = response.products.iter().cloned().collect();
                    info!(seq, products = catalog.len(), "Products updated");
                    self.applied_seq = seq;
                    self.catalog.send_replace(Arc::new(catalog));
                } else {
                    debug!(seq, applied = self.applied_seq, "Stale products response, cache kept");
                }
                self.emit(PurchaseEvent::ProductsUpdateSucceeded {
                    products: response.products,
                    invalid_identifiers: response.invalid_identifiers,
                });
            }
            Err(e) => {
                warn!(seq, error = %e, "Products update failed");
                self.emit(PurchaseEvent::ProductsUpdateFailed {
                    error: PurchaseError::CatalogFetchFailed(e.to_string()),
                });
            }
        }
        self.emit(PurchaseEvent::ProductsUpdateFinished);
    }

    // --- Purchases ---

    fn purchase(&mut self, product_id: ProductId) {
        let known = self.catalog.borrow().contains(&product_id);
        if !known {
            warn!(%product_id, "Purchase of unknown product");
            self.emit(PurchaseEvent::PaymentFailed {
                product_id: product_id.clone(),
                error: PurchaseError::UnknownProductIdentifier(product_id),
            });
            return;
        }
        if self.pending.contains_key(&product_id) {
            warn!(%product_id, "Purchase already pending");
            self.emit(PurchaseEvent::PaymentFailed {
                product_id: product_id.clone(),
                error: PurchaseError::PurchaseAlreadyPending(product_id),
            });
            return;
        }

        self.pending.insert(
            product_id.clone(),
            PendingPurchase {
                state: PurchaseState::Submitted,
                started_at: Utc::now(),
            },
        );
        info!(%product_id, "Purchase started");
        self.emit(PurchaseEvent::PurchaseStarted {
            product_id: product_id.clone(),
        });

        let platform = self.platform.clone();
        let payment = Payment::new(product_id.clone());
        self.spawn_task(async move {
            let result = platform.submit_payment(payment).await;
            PlatformUpdate::SubmissionCompleted { product_id, result }
        });
    }

    fn on_submission_completed(&mut self, product_id: ProductId, result: Result<(), PlatformError>) {
        match result {
            Ok(()) => debug!(%product_id, "Payment submitted"),
            Err(e) => {
                let submitted = self
                    .pending
                    .get(&product_id)
                    .is_some_and(|p| p.state == PurchaseState::Submitted);
                if !submitted {
                    debug!(%product_id, error = %e, "Submission error after resolution, ignoring");
                    return;
                }
                warn!(%product_id, error = %e, "Payment submission failed");
                self.resolve_failure(
                    &product_id,
                    PurchaseError::PurchaseRejectedByPlatform {
                        message: e.to_string(),
                        cancelled: false,
                    },
                );
            }
        }
    }

    fn restore_purchases(&mut self) {
        info!("Restoring completed transactions");
        let platform = self.platform.clone();
        self.spawn_task(async move {
            PlatformUpdate::RestoreCompleted {
                result: platform.restore_completed_transactions().await,
            }
        });
    }

    // --- Transactions ---

    fn on_transaction_updated(&mut self, transaction: Transaction) {
        log_transaction(&transaction);
        let product_id = transaction.product_id().clone();

        let key = TransactionKey::of(&transaction);
        match self.resolved.get(&key).copied() {
            Some(FinishState::FinishFailed) => {
                debug!(%key, "Retrying finish of resolved transaction");
                self.finish_transaction(transaction);
                return;
            }
            Some(state) => {
                debug!(%key, ?state, "Transaction already resolved, ignoring");
                return;
            }
            None => {}
        }

        match transaction.state {
            TransactionState::Purchasing => {
                if let Some(pending) = self.pending.get_mut(&product_id) {
                    pending.state = PurchaseState::Purchasing;
                }
                debug!(%product_id, "Transaction purchasing");
            }
            TransactionState::Failed => {
                if self.verifying.contains(&key) {
                    debug!(%product_id, "Transaction being verified, ignoring failure");
                    return;
                }
                let (message, cancelled) = transaction
                    .error
                    .as_ref()
                    .map(|e| (e.message.clone(), e.cancelled))
                    .unwrap_or_else(|| ("unknown error".to_string(), false));
                info!(%product_id, cancelled, "Payment failed");
                self.finish_transaction(transaction);
                self.resolve_failure(
                    &product_id,
                    PurchaseError::PurchaseRejectedByPlatform { message, cancelled },
                );
            }
            TransactionState::Purchased | TransactionState::Restored => {
                self.verify(transaction)
            }
        }
    }

    fn verify(&mut self, transaction: Transaction) {
        let product_id = transaction.product_id().clone();
        if !self.verifying.insert(TransactionKey::of(&transaction)) {
            debug!(%product_id, "Transaction already being verified");
            return;
        }
        if transaction.state == TransactionState::Purchased {
            if let Some(pending) = self.pending.get_mut(&product_id) {
                pending.state = PurchaseState::Verifying;
            }
        }

        if transaction.receipt.is_none() {
            self.on_verification_completed(transaction, Err(VerificationError::MissingReceipt));
            return;
        }

        debug!(%product_id, "Verifying receipt");
        let verifier = self.verifier.clone();
        let secret = self.shared_secret.clone();
        self.spawn_task(async move {
            let result = verifier.verify(&transaction, &secret).await;
            PlatformUpdate::VerificationCompleted {
                transaction,
                result,
            }
        });
    }

    fn on_verification_completed(
        &mut self,
        transaction: Transaction,
        result: Result<(), VerificationError>,
    ) {
        self.verifying.remove(&TransactionKey::of(&transaction));
        let product_id = transaction.product_id().clone();
        let transaction_id = transaction.id.clone();
        let restored = transaction.state == TransactionState::Restored;

        match result {
            Ok(()) => {
                match self.activators.find(&product_id) {
                    Some(activator) => {
                        info!(%product_id, restored, "Activating product");
                        activator.activate(&product_id);
                    }
                    None => warn!(%product_id, "No activator registered for product"),
                }
                info!(%product_id, "Payment succeeded");
                self.emit(PurchaseEvent::PaymentSucceeded {
                    product_id: product_id.clone(),
                    transaction_id,
                });
            }
            Err(e) => {
                warn!(%product_id, error = %e, "Receipt verification failed");
                self.alert(PurchaseAlert::VerificationFailed {
                    product_id: product_id.clone(),
                });
                self.emit(PurchaseEvent::PaymentVerifyFailed {
                    product_id: product_id.clone(),
                    transaction_id,
                    error: PurchaseError::ReceiptVerificationFailed(e.to_string()),
                });
            }
        }

        self.finish_transaction(transaction);
        if !restored {
            self.finish_purchase(&product_id);
        }
    }

    fn resolve_failure(&mut self, product_id: &ProductId, error: PurchaseError) {
        if let PurchaseError::PurchaseRejectedByPlatform {
            message,
            cancelled: false,
        } = &error
        {
            self.alert(PurchaseAlert::PaymentFailed {
                product_id: product_id.clone(),
                message: message.clone(),
            });
        }
        self.emit(PurchaseEvent::PaymentFailed {
            product_id: product_id.clone(),
            error,
        });
        self.finish_purchase(product_id);
    }

    fn finish_transaction(&mut self, transaction: Transaction) {
        let key = TransactionKey::of(&transaction);
        if let TransactionKey::Id(_) = key {
            self.resolved.insert(key.clone(), FinishState::Finishing);
        }

        let platform = self.platform.clone();
        self.spawn_task(async move {
            let result = platform.finish_transaction(transaction).await;
            PlatformUpdate::TransactionFinished { key, result }
        });
    }

    fn on_transaction_finished(&mut self, key: TransactionKey, result: Result<(), PlatformError>) {
        let state = match result {
            Ok(()) => {
                debug!(%key, "Transaction finished");
                FinishState::Finished
            }
            Err(e) => {
                warn!(%key, error = %e, "Finishing transaction failed");
                FinishState::FinishFailed
            }
        };
        if let TransactionKey::Id(_) = key {
            self.resolved.insert(key, state);
        }
    }

    fn finish_purchase(&mut self, product_id: &ProductId) {
        if let Some(pending) = self.pending.remove(product_id) {
            let elapsed_ms = (Utc::now() - pending.started_at).num_milliseconds();
            info!(%product_id, elapsed_ms, "Purchase finished");
            self.emit(PurchaseEvent::PurchaseFinished {
                product_id: product_id.clone(),
            });
        }
    }

    // --- Plumbing ---

    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = PlatformUpdate> + Send + 'static,
    {
        self.in_flight += 1;
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            let _ = updates.send(task.await);
        });
    }

    fn alert(&self, alert: PurchaseAlert) {
        if let Some(handler) = &self.alert_handler {
            handler.show_alert(alert);
        }
    }

    fn emit(&self, event: PurchaseEvent) {
        debug!(event = event.name(), "Emit");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
