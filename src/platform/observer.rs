//! # Transaction Observer
//!
//! The platform reports transaction state changes on its own schedule: while a
//! payment sheet is open, when a restore replays old purchases, or at launch when
//! the store redelivers transactions that were never finished.
//!
//! The manager hands the platform a [`TransactionObserver`] once, at construction.
//! It holds only a weak handle on the actor's update queue:
//!
//! ```text
//! Platform ──transaction_updated()──> [weak] ──> update queue ──> PurchaseActor
//! ```
//!
//! The actor keeps the only strong sender, so a platform that caches the observer
//! forever cannot keep a stopped manager alive. Once the actor is gone every
//! delivery returns `false`.

use crate::manager::message::PlatformUpdate;
use crate::model::Transaction;
use tokio::sync::mpsc;
use tracing::debug;

/// Sink through which the platform reports transaction state changes.
///
/// Cheap to clone and callable from any thread; delivery never blocks.
#[derive(Clone)]
pub struct TransactionObserver {
    sender: mpsc::WeakUnboundedSender<PlatformUpdate>,
}

impl TransactionObserver {
    pub(crate) fn new(sender: &mpsc::UnboundedSender<PlatformUpdate>) -> Self {
        Self {
            sender: sender.downgrade(),
        }
    }

    /// Delivers one transaction update.
    ///
    /// Returns `false` if the manager has shut down and the update was dropped.
    pub fn transaction_updated(&self, transaction: Transaction) -> bool {
        let product_id = transaction.product_id().clone();
        let delivered = match self.sender.upgrade() {
            Some(sender) => sender
                .send(PlatformUpdate::TransactionUpdated { transaction })
                .is_ok(),
            None => false,
        };
        if !delivered {
            debug!(%product_id, "Manager gone, dropping transaction update");
        }
        delivered
    }

    /// Delivers a batch of updates in order.
    pub fn transactions_updated(&self, transactions: Vec<Transaction>) -> bool {
        transactions
            .into_iter()
            .all(|transaction| self.transaction_updated(transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_fails_once_queue_owner_is_gone() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = TransactionObserver::new(&tx);

        // Strong sender alive: update is queued
        assert!(observer.transaction_updated(Transaction::purchased("tx_1", "pro", vec![1])));
        assert!(matches!(
            rx.try_recv(),
            Ok(PlatformUpdate::TransactionUpdated { .. })
        ));

        // The observer alone does not keep the queue open
        drop(tx);
        assert!(!observer.transaction_updated(Transaction::purchased("tx_2", "pro", vec![1])));
    }
}
