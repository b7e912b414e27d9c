//! # Purchase Manager Client
//!
//! The cloneable handle the app holds. Commands are queued to the
//! [`PurchaseActor`](super::PurchaseActor) and return as soon as they are enqueued;
//! outcomes are observed through [`PurchaseManager::subscribe`].

use super::error::PurchaseError;
use super::message::ManagerRequest;
use crate::model::{Product, ProductCatalog, ProductId, PurchaseEvent};
use crate::platform::{AlertHandler, CommercePlatform, ProductActivator};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct PurchaseManager {
    sender: mpsc::Sender<ManagerRequest>,
    events: broadcast::Sender<PurchaseEvent>,
    catalog: watch::Receiver<Arc<ProductCatalog>>,
    platform: Arc<dyn CommercePlatform>,
}

impl PurchaseManager {
    pub(crate) fn new(
        sender: mpsc::Sender<ManagerRequest>,
        events: broadcast::Sender<PurchaseEvent>,
        catalog: watch::Receiver<Arc<ProductCatalog>>,
        platform: Arc<dyn CommercePlatform>,
    ) -> Self {
        Self {
            sender,
            events,
            catalog,
            platform,
        }
    }

    async fn send(&self, request: ManagerRequest) -> Result<(), PurchaseError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| PurchaseError::ManagerClosed)
    }

    /// Receiver for every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PurchaseEvent> {
        self.events.subscribe()
    }

    #[instrument(skip_all)]
    pub async fn add_product_activator(
        &self,
        activator: Arc<dyn ProductActivator>,
    ) -> Result<(), PurchaseError> {
        debug!("Sending request");
        self.send(ManagerRequest::AddActivator { activator }).await
    }

    /// Removing an activator that was never added is a no-op.
    #[instrument(skip_all)]
    pub async fn remove_product_activator(
        &self,
        activator: Arc<dyn ProductActivator>,
    ) -> Result<(), PurchaseError> {
        debug!("Sending request");
        self.send(ManagerRequest::RemoveActivator { activator }).await
    }

    #[instrument(skip_all)]
    pub async fn set_alert_handler(
        &self,
        handler: Option<Arc<dyn AlertHandler>>,
    ) -> Result<(), PurchaseError> {
        debug!("Sending request");
        self.send(ManagerRequest::SetAlertHandler { handler }).await
    }

    /// Starts a catalog refresh of every product claimed by an activator or listed in
    /// the configuration.
    ///
    /// Emits `ProductsUpdateStarted`, then `ProductsUpdateSucceeded` or
    /// `ProductsUpdateFailed`, then `ProductsUpdateFinished`.
    #[instrument(skip(self))]
    pub async fn update_products(&self) -> Result<(), PurchaseError> {
        debug!("Sending request");
        self.send(ManagerRequest::UpdateProducts).await
    }

    /// Purchase authorization state of the device. Pure query.
    pub fn can_make_purchases(&self) -> bool {
        self.platform.can_make_payments()
    }

    /// [`can_make_purchases`](Self::can_make_purchases) as a `Result`.
    pub fn ensure_can_make_purchases(&self) -> Result<(), PurchaseError> {
        if self.can_make_purchases() {
            Ok(())
        } else {
            Err(PurchaseError::PurchasingUnauthorized)
        }
    }

    /// Starts a purchase.
    ///
    /// Unknown products and products with a purchase already in flight are reported
    /// as `PaymentFailed` without a `PurchaseStarted`. Otherwise `PurchaseStarted` is
    /// followed by exactly one of `PaymentSucceeded`, `PaymentFailed` or
    /// `PaymentVerifyFailed`, then `PurchaseFinished`.
    #[instrument(skip(self, product_id), fields(product_id))]
    pub async fn purchase_product(
        &self,
        product_id: impl Into<ProductId>,
    ) -> Result<(), PurchaseError> {
        let product_id = product_id.into();
        tracing::Span::current().record("product_id", product_id.as_str());
        debug!("Sending request");
        self.send(ManagerRequest::Purchase { product_id }).await
    }

    /// Asks the platform to replay completed transactions.
    #[instrument(skip(self))]
    pub async fn restore_purchases(&self) -> Result<(), PurchaseError> {
        debug!("Sending request");
        self.send(ManagerRequest::RestorePurchases).await
    }

    /// Cached descriptor, if the last successful refresh returned it.
    pub fn product_by_identifier(&self, id: &str) -> Option<Product> {
        self.catalog.borrow().get(&ProductId::from(id)).cloned()
    }

    /// Every cached descriptor, sorted by identifier.
    pub fn products(&self) -> Vec<Product> {
        self.catalog.borrow().products()
    }
}
