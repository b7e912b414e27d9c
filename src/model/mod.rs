//! Pure data structures exchanged between the manager, the platform and subscribers.

pub mod event;
pub mod product;
pub mod transaction;

pub use event::*;
pub use product::*;
pub use transaction::*;
