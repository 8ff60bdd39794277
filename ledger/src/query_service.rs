// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/query_service.rs
// Description: Query service (C11) — read-side projections with cache
//              invalidation hooks. The cache tier itself is an external
//              adapter (spec §1); this service only calls the invalidation
//              hook on every successful mutation.
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AbcClass, ChangeType, ProductStock};
use crate::error::{LedgerError, Result};
use crate::repository::{LedgerRepository, ProductStockRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevelView {
    pub sku: String,
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
    pub available_to_promise: i64,
}

impl From<&ProductStock> for StockLevelView {
    fn from(stock: &ProductStock) -> Self {
        Self {
            sku: stock.sku.clone(),
            quantity_on_hand: stock.stock_level.quantity_on_hand,
            quantity_allocated: stock.stock_level.quantity_allocated,
            available_to_promise: stock.available_to_promise(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthMetrics {
    pub turnover: f64,
    pub dead_stock_skus: Vec<String>,
    pub total_skus: u64,
    pub out_of_stock_skus: u64,
}

/// Signals the cache adapter should drop its entry for `sku`. The core
/// defines only the invalidation point (spec §9); wiring an actual cache is
/// peripheral, so this is a plain callback the composition root supplies.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, sku: &str);
}

pub struct NoopCacheInvalidator;

impl CacheInvalidator for NoopCacheInvalidator {
    fn invalidate(&self, _sku: &str) {}
}

pub struct QueryService {
    repository: Arc<dyn ProductStockRepository>,
    ledger: Arc<dyn LedgerRepository>,
    cache: Arc<dyn CacheInvalidator>,
}

impl QueryService {
    pub fn new(
        repository: Arc<dyn ProductStockRepository>,
        ledger: Arc<dyn LedgerRepository>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self { repository, ledger, cache }
    }

    pub async fn get_stock_level(&self, sku: &str) -> Result<StockLevelView> {
        let stock = self
            .repository
            .find(sku)
            .await?
            .ok_or_else(|| LedgerError::ProductStockNotFound(sku.to_string()))?;
        Ok(StockLevelView::from(&stock))
    }

    /// `GetHealthMetrics(categoryFilter?, dateRange?)` (spec §6.1). Turnover
    /// is picks-in-window over total on-hand across the filtered population;
    /// a SKU with zero picks in the window counts as dead stock.
    pub async fn get_health_metrics(
        &self,
        category_filter: Option<AbcClass>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<HealthMetrics> {
        let stocks = self.repository.list_all().await?;
        let mut total_skus = 0u64;
        let mut out_of_stock_skus = 0u64;
        let mut dead_stock_skus = Vec::new();
        let mut total_picked: i64 = 0;
        let mut total_on_hand: i64 = 0;

        for stock in &stocks {
            if let Some(class) = category_filter {
                match &stock.abc_classification {
                    Some(classification) if classification.class == class => {}
                    _ => continue,
                }
            }
            total_skus += 1;
            total_on_hand += stock.stock_level.quantity_on_hand;
            if stock.stock_level.quantity_on_hand == 0 {
                out_of_stock_skus += 1;
            }

            let history = self.ledger.history_for_sku(&stock.sku, since).await?;
            let picked: i64 = history
                .iter()
                .filter(|entry| entry.change_type == ChangeType::Pick)
                .filter(|entry| until.map(|u| entry.timestamp <= u).unwrap_or(true))
                .map(|entry| entry.quantity_change.abs())
                .sum();
            total_picked += picked;
            if picked == 0 {
                dead_stock_skus.push(stock.sku.clone());
            }
        }

        let turnover = if total_on_hand > 0 { total_picked as f64 / total_on_hand as f64 } else { 0.0 };
        Ok(HealthMetrics { turnover, dead_stock_skus, total_skus, out_of_stock_skus })
    }

    /// Called by the command service on successful commit (spec §4.2 step 6).
    pub fn invalidate(&self, sku: &str) {
        self.cache.invalidate(sku);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeType, InventoryLedgerEntry, ReasonCode};
    use crate::repo_memory::{InMemoryLedgerRepository, InMemoryProductStockRepository};

    #[tokio::test]
    async fn get_stock_level_returns_not_found_for_unknown_sku() {
        let repo: Arc<dyn ProductStockRepository> = Arc::new(InMemoryProductStockRepository::default());
        let ledger: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedgerRepository::default());
        let query = QueryService::new(repo, ledger, Arc::new(NoopCacheInvalidator));
        let err = query.get_stock_level("SKU-MISSING").await.unwrap_err();
        assert!(matches!(err, LedgerError::ProductStockNotFound(_)));
    }

    #[tokio::test]
    async fn get_stock_level_reflects_committed_state() {
        let repo = Arc::new(InMemoryProductStockRepository::default());
        let mut stock = crate::domain::ProductStock::create("SKU-A");
        stock.adjust_quantity_on_hand(50, ReasonCode::PurchaseReceipt).unwrap();
        repo.save(&stock, 0, None, &[]).await.unwrap();

        let ledger: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedgerRepository::default());
        let query = QueryService::new(repo, ledger, Arc::new(NoopCacheInvalidator));
        let view = query.get_stock_level("SKU-A").await.unwrap();
        assert_eq!(view.quantity_on_hand, 50);
        assert_eq!(view.available_to_promise, 50);
    }

    #[tokio::test]
    async fn get_health_metrics_counts_out_of_stock_and_dead_stock() {
        let repo = Arc::new(InMemoryProductStockRepository::default());
        let ledger = Arc::new(InMemoryLedgerRepository::default());

        let mut active = crate::domain::ProductStock::create("SKU-ACTIVE");
        active.adjust_quantity_on_hand(100, ReasonCode::PurchaseReceipt).unwrap();
        repo.save(&active, 0, None, &[]).await.unwrap();
        ledger
            .append(&InventoryLedgerEntry::new("SKU-ACTIVE", -10, ChangeType::Pick, "PICK", None, None))
            .await
            .unwrap();

        let mut dead = crate::domain::ProductStock::create("SKU-DEAD");
        dead.adjust_quantity_on_hand(40, ReasonCode::PurchaseReceipt).unwrap();
        repo.save(&dead, 0, None, &[]).await.unwrap();

        let empty = crate::domain::ProductStock::create("SKU-EMPTY");
        repo.save(&empty, 0, None, &[]).await.unwrap();

        let query = QueryService::new(repo, ledger, Arc::new(NoopCacheInvalidator));
        let metrics = query.get_health_metrics(None, None, None).await.unwrap();

        assert_eq!(metrics.total_skus, 3);
        assert_eq!(metrics.out_of_stock_skus, 1);
        assert!(metrics.dead_stock_skus.contains(&"SKU-DEAD".to_string()));
        assert!(metrics.dead_stock_skus.contains(&"SKU-EMPTY".to_string()));
        assert!(!metrics.dead_stock_skus.contains(&"SKU-ACTIVE".to_string()));
        assert!(metrics.turnover > 0.0);
    }
}
