//! # StoreKit Actor
//!
//! > **An in-app purchase manager built as a Tokio actor.**
//!
//! The crate proxies a platform commerce framework (catalog lookup, payment
//! submission, transaction observation) and turns its callbacks into a stream of
//! typed [`PurchaseEvent`](model::PurchaseEvent)s. Verified purchases are handed to
//! the [`ProductActivator`](platform::ProductActivator) responsible for the product.
//!
//! ## 🏗️ Design
//!
//! ### One owner for all state
//! The [`PurchaseActor`](manager::PurchaseActor) runs in its own task and owns the
//! product catalog, the activator registry and the table of pending purchases.
//! Platform calls run in spawned tasks and post their results back into the actor's
//! queue, so every mutation happens in one place and no locks are needed.
//!
//! ### Fire-and-forget commands
//! [`PurchaseManager`](manager::PurchaseManager) methods return once the command is
//! queued. Outcomes arrive as events on [`subscribe`](manager::PurchaseManager::subscribe):
//!
//! ```text
//! update_products   -> products-update-started, products-update-{success|failed}, products-update-finished
//! purchase_product  -> purchase-started, payment-{success|fail|verify-fail}, purchase-finished
//! ```
//!
//! ### Errors never cross the boundary
//! Catalog and payment failures travel inside events. The only error a client call
//! returns is [`PurchaseError::ManagerClosed`](manager::PurchaseError::ManagerClosed).
//!
//! ## 🗺️ Module Tour
//!
//! - [`manager`] - the actor, its client handle and [`PurchaseError`](manager::PurchaseError).
//! - [`platform`] - collaborator traits (`CommercePlatform`, `ReceiptVerifier`,
//!   `ProductActivator`, `AlertHandler`) and the [`mock`](platform::mock) doubles.
//! - [`model`] - products, transactions and events.
//! - [`diagnostics`] - transaction dumps for debug logs.
//! - [`config`] - [`ManagerConfig`](config::ManagerConfig).
//! - [`lifecycle`] - [`PurchaseSystem`](lifecycle::PurchaseSystem) and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```ignore
//! setup_tracing();
//! let system = PurchaseSystem::start(ManagerConfig::new(secret), platform, verifier)?;
//! let mut events = system.manager.subscribe();
//!
//! system.manager.add_product_activator(Arc::new(ProUnlocker::default())).await?;
//! system.manager.update_products().await?;
//! system.manager.purchase_product("pro_upgrade").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     info!(event = event.name(), "Purchase event");
//! }
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod config;
pub mod diagnostics;
pub mod lifecycle;
pub mod manager;
pub mod model;
pub mod platform;
