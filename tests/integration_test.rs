//! End-to-end runs through [`PurchaseSystem`], the way an app wires the manager:
//! start, register activators, refresh the catalog, purchase, shut down.
//!
//! Pattern: System + Mock Platform
//! - Real actor spawned by `PurchaseSystem::start`
//! - `MockPlatform` scripted with catalog expectations; `verify()` at the end
//!   checks every expectation was consumed

use std::sync::Arc;
use std::time::Duration;

use storekit_actor::config::ManagerConfig;
use storekit_actor::lifecycle::PurchaseSystem;
use storekit_actor::manager::PurchaseError;
use storekit_actor::model::{Product, ProductId, ProductsResponse, PurchaseEvent, Transaction};
use storekit_actor::platform::mock::{MockPlatform, MockVerifier, RecordingActivator};
use storekit_actor::platform::PlatformError;
use tokio::sync::broadcast;

async fn next_event(events: &mut broadcast::Receiver<PurchaseEvent>) -> PurchaseEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Full end-to-end run through the system orchestrator.
#[tokio::test]
async fn test_full_purchase_system_integration() {
    let platform = Arc::new(MockPlatform::new());
    let verifier = Arc::new(MockVerifier::accepting());
    let system = PurchaseSystem::start(
        ManagerConfig::new("shared-secret"),
        platform.clone(),
        verifier,
    )
    .expect("Failed to start system");
    let mut events = system.manager.subscribe();

    // Catalog is empty before the first refresh
    assert!(system.manager.product_by_identifier("pro_upgrade").is_none());

    let activator = Arc::new(RecordingActivator::new(["pro_upgrade", "coins_100"]));
    system
        .manager
        .add_product_activator(activator.clone())
        .await
        .unwrap();

    platform.expect_products().return_response(ProductsResponse {
        products: vec![
            Product::new("pro_upgrade", "Pro Upgrade", 4_990_000, "USD"),
            Product::new("coins_100", "100 Coins", 990_000, "USD"),
        ],
        invalid_identifiers: vec![ProductId::from("retired_sku")],
    });
    system.manager.update_products().await.unwrap();

    assert_eq!(next_event(&mut events).await, PurchaseEvent::ProductsUpdateStarted);
    match next_event(&mut events).await {
        PurchaseEvent::ProductsUpdateSucceeded {
            products,
            invalid_identifiers,
        } => {
            assert_eq!(products.len(), 2);
            assert_eq!(invalid_identifiers, vec![ProductId::from("retired_sku")]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(next_event(&mut events).await, PurchaseEvent::ProductsUpdateFinished);

    let pro = system
        .manager
        .product_by_identifier("pro_upgrade")
        .expect("pro_upgrade should be cached");
    assert_eq!(pro.price.micros, 4_990_000);
    assert_eq!(pro.price.currency, "USD");
    assert!(system.manager.product_by_identifier("retired_sku").is_none());
    assert_eq!(system.manager.products().len(), 2);

    system.manager.purchase_product("coins_100").await.unwrap();
    assert_eq!(next_event(&mut events).await.name(), "purchase-started");
    platform.next_payment().await.unwrap();
    platform.deliver(Transaction::purchased("tx_1", "coins_100", b"receipt".to_vec()));
    assert_eq!(next_event(&mut events).await.name(), "payment-success");
    assert_eq!(next_event(&mut events).await.name(), "purchase-finished");

    system.shutdown().await.expect("Failed to shutdown system");

    assert_eq!(activator.activation_count("coins_100"), 1);
    assert_eq!(activator.activation_count("pro_upgrade"), 0);
    platform.verify();
}

#[tokio::test]
async fn test_start_fails_without_commerce() {
    let result = PurchaseSystem::start(
        ManagerConfig::new("shared-secret"),
        Arc::new(MockPlatform::unavailable()),
        Arc::new(MockVerifier::accepting()),
    );
    assert_eq!(result.err(), Some(PurchaseError::PlatformUnavailable));
}

/// A failed refresh keeps the previous catalog; a later success replaces it.
#[tokio::test]
async fn test_catalog_refresh_failure_and_replacement() {
    let platform = Arc::new(MockPlatform::new());
    let system = PurchaseSystem::start(
        ManagerConfig::new("s").with_product_identifiers(["a", "b"]),
        platform.clone(),
        Arc::new(MockVerifier::accepting()),
    )
    .unwrap();
    let mut events = system.manager.subscribe();

    platform.expect_products().return_ok(vec![
        Product::new("a", "A", 1_000_000, "EUR"),
        Product::new("b", "B", 2_000_000, "EUR"),
    ]);
    platform
        .expect_products()
        .return_err(PlatformError::Transport("timeout".to_string()));
    platform
        .expect_products()
        .return_ok(vec![Product::new("b", "B", 2_500_000, "EUR")]);

    system.manager.update_products().await.unwrap();
    while next_event(&mut events).await != PurchaseEvent::ProductsUpdateFinished {}
    assert!(system.manager.product_by_identifier("a").is_some());

    system.manager.update_products().await.unwrap();
    assert_eq!(next_event(&mut events).await, PurchaseEvent::ProductsUpdateStarted);
    assert_eq!(
        next_event(&mut events).await,
        PurchaseEvent::ProductsUpdateFailed {
            error: PurchaseError::CatalogFetchFailed(
                "Platform transport error: timeout".to_string()
            ),
        }
    );
    assert_eq!(next_event(&mut events).await, PurchaseEvent::ProductsUpdateFinished);
    assert_eq!(system.manager.products().len(), 2);

    system.manager.update_products().await.unwrap();
    while next_event(&mut events).await != PurchaseEvent::ProductsUpdateFinished {}
    assert!(system.manager.product_by_identifier("a").is_none());
    assert_eq!(
        system
            .manager
            .product_by_identifier("b")
            .map(|p| p.price.micros),
        Some(2_500_000)
    );

    system.shutdown().await.unwrap();
    platform.verify();
}

/// Two refreshes in flight: the older one answers last and must not win.
#[tokio::test]
async fn test_overlapping_refreshes_keep_newest_catalog() {
    let platform = Arc::new(MockPlatform::new());
    let system = PurchaseSystem::start(
        ManagerConfig::new("s").with_product_identifiers(["old", "new"]),
        platform.clone(),
        Arc::new(MockVerifier::accepting()),
    )
    .unwrap();
    let mut events = system.manager.subscribe();

    // First request is slow, second answers at once
    platform
        .expect_products()
        .after(Duration::from_millis(200))
        .return_ok(vec![Product::new("old", "Old", 1_000_000, "USD")]);
    platform
        .expect_products()
        .return_ok(vec![Product::new("new", "New", 1_000_000, "USD")]);

    system.manager.update_products().await.unwrap();
    system.manager.update_products().await.unwrap();

    // Both refreshes still report
    let mut succeeded = 0;
    let mut finished = 0;
    while finished < 2 {
        match next_event(&mut events).await {
            PurchaseEvent::ProductsUpdateSucceeded { .. } => succeeded += 1,
            PurchaseEvent::ProductsUpdateFinished => finished += 1,
            _ => {}
        }
    }
    assert_eq!(succeeded, 2);

    assert!(system.manager.product_by_identifier("new").is_some());
    assert!(system.manager.product_by_identifier("old").is_none());

    system.shutdown().await.unwrap();
    platform.verify();
}
