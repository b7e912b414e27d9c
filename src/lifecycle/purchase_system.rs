use crate::config::ManagerConfig;
use crate::manager::{self, PurchaseError, PurchaseManager};
use crate::platform::{CommercePlatform, ReceiptVerifier};
use std::sync::Arc;
use tracing::{error, info};

/// Owns the running purchase actor.
///
/// # Example
///
/// ```ignore
/// let system = PurchaseSystem::start(config, platform, verifier)?;
///
/// system.manager.add_product_activator(activator).await?;
/// system.manager.update_products().await?;
///
/// system.shutdown().await?;
/// ```
pub struct PurchaseSystem {
    /// Client for the purchase actor. Clone it freely.
    pub manager: PurchaseManager,

    handle: tokio::task::JoinHandle<()>,
}

impl PurchaseSystem {
    /// Builds the manager and spawns its actor on the current runtime.
    ///
    /// # Errors
    /// [`PurchaseError::PlatformUnavailable`] if the host has no commerce support.
    pub fn start(
        config: ManagerConfig,
        platform: Arc<dyn CommercePlatform>,
        verifier: Arc<dyn ReceiptVerifier>,
    ) -> Result<Self, PurchaseError> {
        let (actor, manager) = manager::new(config, platform, verifier)?;
        let handle = tokio::spawn(actor.run());
        info!("Purchase system started");
        Ok(Self { manager, handle })
    }

    /// Drops this handle and waits for the actor to stop.
    ///
    /// The actor stops once every clone of the manager is gone and in-flight platform
    /// work has reported back.
    ///
    /// # Errors
    /// [`PurchaseError::ManagerClosed`] if the actor task panicked.
    pub async fn shutdown(self) -> Result<(), PurchaseError> {
        info!("Shutting down purchase system...");
        drop(self.manager);

        if let Err(e) = self.handle.await {
            error!("Purchase actor failed: {:?}", e);
            return Err(PurchaseError::ManagerClosed);
        }

        info!("Purchase system shutdown complete.");
        Ok(())
    }
}
