//! End-to-end scenarios against the public library API (spec §8). No HTTP
//! transport is involved — the command/query surface is exercised directly,
//! the same way a transport adapter built on top of this crate would call it.

use std::sync::Arc;

use olympus_ledger::{CommandRetryConfig, CommandService, NoopCacheInvalidator, QueryService};
use olympus_ledger::repo_memory::{InMemoryOutboxRepository, InMemoryProductStockRepository, InMemorySerialNumberRepository};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_6_concurrent_allocate_allows_at_most_one_winner_per_cas_round() {
    let repo = Arc::new(InMemoryProductStockRepository::default());
    let query = QueryService::new(repo.clone(), repo.ledger_repository(), Arc::new(NoopCacheInvalidator));
    let service = Arc::new(CommandService::new(
        repo.clone(),
        Arc::new(InMemorySerialNumberRepository::default()),
        repo.outbox_repository(),
        Arc::new(NoopCacheInvalidator),
        CommandRetryConfig::default(),
    ));

    service
        .adjust_stock("SKU-A", 100, olympus_ledger::domain::ReasonCode::PurchaseReceipt, None)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.allocate("SKU-A", 15, format!("ORD-{i}")).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    // 100 / 15 = 6 remainder 10: exactly 6 requests can be satisfied.
    assert_eq!(successes, 6);

    let final_view = query.get_stock_level("SKU-A").await.unwrap();
    assert_eq!(final_view.quantity_allocated, 90);
    assert_eq!(final_view.available_to_promise, 10);
}

#[tokio::test]
async fn scenario_1_receipt_then_query() {
    let repo = Arc::new(InMemoryProductStockRepository::default());
    let service = CommandService::new(
        repo.clone(),
        Arc::new(InMemorySerialNumberRepository::default()),
        repo.outbox_repository(),
        Arc::new(NoopCacheInvalidator),
        CommandRetryConfig::default(),
    );

    let stock = service
        .adjust_stock("SKU-A", 100, olympus_ledger::domain::ReasonCode::PurchaseReceipt, None)
        .await
        .unwrap();

    assert_eq!(stock.stock_level.quantity_on_hand, 100);
    assert_eq!(stock.stock_level.quantity_allocated, 0);
    assert_eq!(stock.available_to_promise(), 100);
}
