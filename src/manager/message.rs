//! Messages consumed by the [`PurchaseActor`](super::PurchaseActor) loop.
//!
//! Two queues feed the loop. [`ManagerRequest`]s come from client handles and close
//! when every handle is dropped. [`PlatformUpdate`]s come from the platform observer
//! and from the tasks the actor spawns for platform calls; they carry results back so
//! that every state mutation happens inside the loop.

use crate::model::{ProductId, ProductsResponse, Transaction, TransactionId};
use crate::platform::{AlertHandler, PlatformError, ProductActivator, VerificationError};
use std::fmt;
use std::sync::Arc;

/// Identity of a transaction inside the actor.
///
/// The platform identifier when there is one, otherwise the product it pays for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TransactionKey {
    Id(TransactionId),
    Product(ProductId),
}

impl TransactionKey {
    pub(crate) fn of(transaction: &Transaction) -> Self {
        match &transaction.id {
            Some(id) => TransactionKey::Id(id.clone()),
            None => TransactionKey::Product(transaction.product_id().clone()),
        }
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKey::Id(id) => write!(f, "{}", id),
            TransactionKey::Product(product_id) => write!(f, "product:{}", product_id),
        }
    }
}

pub(crate) enum ManagerRequest {
    AddActivator {
        activator: Arc<dyn ProductActivator>,
    },
    RemoveActivator {
        activator: Arc<dyn ProductActivator>,
    },
    SetAlertHandler {
        handler: Option<Arc<dyn AlertHandler>>,
    },
    UpdateProducts,
    Purchase {
        product_id: ProductId,
    },
    RestorePurchases,
}

pub(crate) enum PlatformUpdate {
    /// Pushed by the platform through the observer.
    TransactionUpdated {
        transaction: Transaction,
    },
    /// `seq` orders overlapping refreshes.
    ProductsLoaded {
        seq: u64,
        result: Result<ProductsResponse, PlatformError>,
    },
    SubmissionCompleted {
        product_id: ProductId,
        result: Result<(), PlatformError>,
    },
    VerificationCompleted {
        transaction: Transaction,
        result: Result<(), VerificationError>,
    },
    TransactionFinished {
        key: TransactionKey,
        result: Result<(), PlatformError>,
    },
    RestoreCompleted {
        result: Result<(), PlatformError>,
    },
}

impl PlatformUpdate {
    /// Whether this update completes a task spawned by the actor.
    pub(crate) fn completes_task(&self) -> bool {
        !matches!(self, PlatformUpdate::TransactionUpdated { .. })
    }
}
