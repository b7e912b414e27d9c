//! Lifecycle events broadcast by the manager.
//!
//! Every event has a stable notification name (see [`PurchaseEvent::name`]) so hosts
//! that bridge into a string-keyed notification center can keep their existing keys.

use crate::manager::PurchaseError;
use crate::model::{Product, ProductId, TransactionId};

/// A typed lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseEvent {
    ProductsUpdateStarted,
    ProductsUpdateSucceeded {
        products: Vec<Product>,
        invalid_identifiers: Vec<ProductId>,
    },
    ProductsUpdateFailed {
        error: PurchaseError,
    },
    /// Always follows either `ProductsUpdateSucceeded` or `ProductsUpdateFailed`.
    ProductsUpdateFinished,

    PurchaseStarted {
        product_id: ProductId,
    },
    PaymentSucceeded {
        product_id: ProductId,
        transaction_id: Option<TransactionId>,
    },
    PaymentFailed {
        product_id: ProductId,
        error: PurchaseError,
    },
    /// The platform accepted the payment but the receipt did not verify.
    PaymentVerifyFailed {
        product_id: ProductId,
        transaction_id: Option<TransactionId>,
        error: PurchaseError,
    },
    PurchaseFinished {
        product_id: ProductId,
    },
}

impl PurchaseEvent {
    /// Notification name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            PurchaseEvent::ProductsUpdateStarted => "products-update-started",
            PurchaseEvent::ProductsUpdateSucceeded { .. } => "products-update-success",
            PurchaseEvent::ProductsUpdateFailed { .. } => "products-update-failed",
            PurchaseEvent::ProductsUpdateFinished => "products-update-finished",
            PurchaseEvent::PurchaseStarted { .. } => "purchase-started",
            PurchaseEvent::PaymentSucceeded { .. } => "payment-success",
            PurchaseEvent::PaymentFailed { .. } => "payment-fail",
            PurchaseEvent::PaymentVerifyFailed { .. } => "payment-verify-fail",
            PurchaseEvent::PurchaseFinished { .. } => "purchase-finished",
        }
    }

    /// True for the events that resolve a payment.
    pub fn is_terminal_payment(&self) -> bool {
        matches!(
            self,
            PurchaseEvent::PaymentSucceeded { .. }
                | PurchaseEvent::PaymentFailed { .. }
                | PurchaseEvent::PaymentVerifyFailed { .. }
        )
    }

    /// Product the event refers to, if any.
    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            PurchaseEvent::PurchaseStarted { product_id }
            | PurchaseEvent::PaymentSucceeded { product_id, .. }
            | PurchaseEvent::PaymentFailed { product_id, .. }
            | PurchaseEvent::PaymentVerifyFailed { product_id, .. }
            | PurchaseEvent::PurchaseFinished { product_id } => Some(product_id),
            _ => None,
        }
    }
}
