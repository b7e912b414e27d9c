use crate::model::ProductId;
use crate::platform::ProductActivator;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// Ordered set of registered activators.
///
/// Identity is pointer identity of the shared reference. When two activators claim
/// the same product, the one registered first receives the activation.
#[derive(Default)]
pub(crate) struct ActivatorRegistry {
    activators: Vec<Arc<dyn ProductActivator>>,
}

fn same(a: &Arc<dyn ProductActivator>, b: &Arc<dyn ProductActivator>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl ActivatorRegistry {
    /// Returns `false` if the activator was already registered.
    pub(crate) fn add(&mut self, activator: Arc<dyn ProductActivator>) -> bool {
        if self.activators.iter().any(|a| same(a, &activator)) {
            return false;
        }
        for id in activator.product_identifiers() {
            if self.find(&id).is_some() {
                warn!(product_id = %id, "Product already claimed by an earlier activator");
            }
        }
        self.activators.push(activator);
        true
    }

    /// Returns `false` if the activator was not registered.
    pub(crate) fn remove(&mut self, activator: &Arc<dyn ProductActivator>) -> bool {
        let before = self.activators.len();
        self.activators.retain(|a| !same(a, activator));
        self.activators.len() != before
    }

    /// First registered activator claiming `product_id`.
    pub(crate) fn find(&self, product_id: &ProductId) -> Option<&Arc<dyn ProductActivator>> {
        self.activators
            .iter()
            .find(|a| a.product_identifiers().contains(product_id))
    }

    pub(crate) fn claimed_ids(&self) -> BTreeSet<ProductId> {
        self.activators
            .iter()
            .flat_map(|a| a.product_identifiers())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.activators.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::RecordingActivator;

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = ActivatorRegistry::default();
        let activator: Arc<dyn ProductActivator> = Arc::new(RecordingActivator::new(["pro_upgrade"]));

        assert!(registry.add(activator.clone()));
        assert!(!registry.add(activator.clone()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_unregistered_is_noop() {
        let mut registry = ActivatorRegistry::default();
        let registered: Arc<dyn ProductActivator> = Arc::new(RecordingActivator::new(["a"]));
        let stranger: Arc<dyn ProductActivator> = Arc::new(RecordingActivator::new(["a"]));
        registry.add(registered.clone());

        assert!(!registry.remove(&stranger));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&registered));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_first_registered_claim_wins() {
        let mut registry = ActivatorRegistry::default();
        let first = Arc::new(RecordingActivator::new(["pro_upgrade"]));
        let second = Arc::new(RecordingActivator::new(["pro_upgrade", "coins_100"]));
        registry.add(first.clone());
        registry.add(second.clone());

        let pro = ProductId::from("pro_upgrade");
        let found = registry.find(&pro).unwrap();
        let first_dyn: Arc<dyn ProductActivator> = first;
        assert!(same(found, &first_dyn));

        let coins = ProductId::from("coins_100");
        let second_dyn: Arc<dyn ProductActivator> = second;
        assert!(same(registry.find(&coins).unwrap(), &second_dyn));

        let ids: Vec<ProductId> = registry.claimed_ids().into_iter().collect();
        assert_eq!(ids, vec![coins, pro]);
    }
}
