//! The purchase manager: actor, client handle and error types.

mod actor;
mod client;
pub mod error;
pub(crate) mod message;
mod registry;

pub use actor::PurchaseActor;
pub use client::PurchaseManager;
pub use error::*;

use crate::config::ManagerConfig;
use crate::model::ProductCatalog;
use crate::platform::{CommercePlatform, ReceiptVerifier, TransactionObserver};
use actor::ActorParts;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::warn;

/// Creates the purchase actor and its client.
///
/// Registers the transaction observer with the platform. The actor must be spawned
/// with [`PurchaseActor::run`] before requests are processed.
///
/// # Errors
/// [`PurchaseError::PlatformUnavailable`] if the platform reports commerce is not
/// supported on this host.
pub fn new(
    config: ManagerConfig,
    platform: Arc<dyn CommercePlatform>,
    verifier: Arc<dyn ReceiptVerifier>,
) -> Result<(PurchaseActor, PurchaseManager), PurchaseError> {
    if !platform.is_available() {
        warn!("Commerce platform unavailable");
        return Err(PurchaseError::PlatformUnavailable);
    }

    let (sender, receiver) = mpsc::channel(config.request_buffer.max(1));
    let (updates_tx, updates) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    let (catalog_tx, catalog_rx) = watch::channel(Arc::new(ProductCatalog::default()));

    platform.observe_transactions(TransactionObserver::new(&updates_tx));

    let actor = PurchaseActor::new(ActorParts {
        receiver,
        updates,
        updates_tx,
        platform: platform.clone(),
        verifier,
        shared_secret: config.shared_secret,
        configured_ids: config.product_identifiers,
        catalog: catalog_tx,
        events: events.clone(),
    });
    let client = PurchaseManager::new(sender, events, catalog_rx, platform);

    Ok((actor, client))
}
