//! # Runtime Lifecycle
//!
//! Starting, wiring and shutting down the purchase manager, plus tracing setup.
//!
//! The [`PurchaseSystem`] owns the actor task:
//!
//! 1. **Start** - check platform availability, build the actor and its client,
//!    spawn the actor on the current Tokio runtime
//! 2. **Use** - hand clones of [`PurchaseSystem::manager`] to the rest of the app
//! 3. **Shutdown** - drop the handle and await the actor, which first drains any
//!    platform work still in flight
//!
//! ## Observability
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info                   # purchase and catalog outcomes
//! RUST_LOG=storekit_actor=debug   # requests, emitted events, transaction dumps
//! ```

pub mod purchase_system;
pub mod tracing;

pub use self::purchase_system::*;
pub use self::tracing::*;
