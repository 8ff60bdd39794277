// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/command_service.rs
// Description: Command service (C7) — orchestrates the per-command
//              transaction: load → mutate → persist aggregate+ledger+outbox
//              atomically, retrying on optimistic-lock conflict with
//              bounded exponential backoff (spec §4.2).
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::value_objects::{AbcClass, HoldType, SerialNumber, StockStatus, ValuationMethod};
use crate::domain::{ChangeType, InventoryLedgerEntry, ProductStock, ReasonCode};
use crate::error::{LedgerError, Result};
use crate::outbox::OutboxEvent;
use crate::query_service::CacheInvalidator;
use crate::repository::{OutboxRepository, ProductStockRepository, SerialNumberRepository};

#[derive(Debug, Clone)]
pub struct CommandRetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl Default for CommandRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(2000),
            deadline: Duration::from_secs(5),
        }
    }
}

pub struct CommandService {
    repository: Arc<dyn ProductStockRepository>,
    serials: Arc<dyn SerialNumberRepository>,
    outbox: Arc<dyn OutboxRepository>,
    cache: Arc<dyn CacheInvalidator>,
    retry: CommandRetryConfig,
}

/// One mutation attempt against a loaded aggregate. Returns the ledger
/// entry to record (if the mutation carries a non-zero quantity delta) or
/// `None` for status-only changes (spec §4.2 step 3).
type Mutation = Box<dyn Fn(&mut ProductStock) -> Result<Option<InventoryLedgerEntry>> + Send + Sync>;

impl CommandService {
    pub fn new(
        repository: Arc<dyn ProductStockRepository>,
        serials: Arc<dyn SerialNumberRepository>,
        outbox: Arc<dyn OutboxRepository>,
        cache: Arc<dyn CacheInvalidator>,
        retry: CommandRetryConfig,
    ) -> Self {
        Self { repository, serials, outbox, cache, retry }
    }

    /// The generic retry helper wrapping load-mutate-persist with bounded
    /// exponential backoff and deadline awareness (spec §9). `allow_create`
    /// governs whether a missing SKU is treated as a fresh aggregate
    /// (receipt-like operations) or a `ProductStockNotFound` error.
    #[instrument(skip(self, mutate))]
    async fn execute(&self, sku: &str, allow_create: bool, mutate: Mutation) -> Result<ProductStock> {
        let deadline = tokio::time::Instant::now() + self.retry.deadline;
        let mut attempt = 0u32;
        let mut delay = self.retry.base_delay;

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(LedgerError::Timeout);
            }

            let mut stock = match self.repository.find(sku).await? {
                Some(stock) => stock,
                None if allow_create => ProductStock::create(sku),
                None => return Err(LedgerError::ProductStockNotFound(sku.to_string())),
            };
            let expected_version = stock.version;

            let ledger_entry = mutate(&mut stock)?;

            let outbox_rows: Vec<OutboxEvent> = stock
                .pending_events
                .iter()
                .map(OutboxEvent::from_domain_event)
                .collect::<std::result::Result<_, _>>()
                .map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;

            let persisted = self
                .repository
                .save(&stock, expected_version, ledger_entry.as_ref(), &outbox_rows)
                .await?;

            if persisted {
                stock.take_pending_events();
                stock.version = expected_version + 1;
                self.cache.invalidate(sku);
                return Ok(stock);
            }

            attempt += 1;
            if attempt >= self.retry.max_attempts {
                return Err(LedgerError::ConcurrentModification(sku.to_string()));
            }
            warn!(sku, attempt, "optimistic-lock conflict, retrying");
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.retry.max_delay);
        }
    }

    pub async fn adjust_stock(&self, sku: &str, quantity_change: i64, reason: ReasonCode, operator_id: Option<String>) -> Result<ProductStock> {
        let sku_owned = sku.to_string();
        let reason_clone = reason;
        let operator = operator_id.clone();
        self.execute(
            sku,
            true,
            Box::new(move |stock| {
                stock.adjust_quantity_on_hand(quantity_change, reason_clone)?;
                Ok(Some(InventoryLedgerEntry::new(
                    sku_owned.clone(),
                    quantity_change,
                    InventoryLedgerEntry::adjustment_change_type(quantity_change),
                    format!("{reason_clone:?}"),
                    None,
                    operator.clone(),
                )))
            }),
        )
        .await
    }

    pub async fn allocate(&self, sku: &str, qty: i64, order_id: impl Into<String>) -> Result<ProductStock> {
        let sku_owned = sku.to_string();
        let order_id = order_id.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.allocate(qty)?;
                Ok(Some(InventoryLedgerEntry::new(
                    sku_owned.clone(),
                    qty,
                    ChangeType::Allocation,
                    "CreateReservation",
                    Some(order_id.clone()),
                    None,
                )))
            }),
        )
        .await
    }

    pub async fn deallocate(&self, sku: &str, qty: i64, order_id: impl Into<String>) -> Result<ProductStock> {
        let sku_owned = sku.to_string();
        let order_id = order_id.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.deallocate(qty)?;
                Ok(Some(InventoryLedgerEntry::new(
                    sku_owned.clone(),
                    -qty,
                    ChangeType::Deallocation,
                    "CancelReservation",
                    Some(order_id.clone()),
                    None,
                )))
            }),
        )
        .await
    }

    pub async fn receive_stock(&self, sku: &str, qty: i64, receipt_id: Option<String>) -> Result<ProductStock> {
        let sku_owned = sku.to_string();
        let receipt = receipt_id.clone();
        self.execute(
            sku,
            true,
            Box::new(move |stock| {
                stock.receive_stock(qty)?;
                Ok(Some(InventoryLedgerEntry::new(
                    sku_owned.clone(),
                    qty,
                    ChangeType::Receipt,
                    "PURCHASE_RECEIPT",
                    receipt.clone(),
                    None,
                )))
            }),
        )
        .await
    }

    /// Ingested `*.item.picked` events and the `processItemPicked` command
    /// both flow through here.
    pub async fn process_item_picked(&self, sku: &str, qty: i64, order_id: impl Into<String>) -> Result<ProductStock> {
        let sku_owned = sku.to_string();
        let order_id = order_id.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.process_pick(qty)?;
                Ok(Some(InventoryLedgerEntry::new(
                    sku_owned.clone(),
                    -qty,
                    ChangeType::Pick,
                    "ITEM_PICKED",
                    Some(order_id.clone()),
                    None,
                )))
            }),
        )
        .await
    }

    pub async fn place_hold(
        &self,
        sku: &str,
        hold_type: HoldType,
        qty: i64,
        reason: impl Into<String>,
        placed_by: impl Into<String>,
    ) -> Result<ProductStock> {
        let reason = reason.into();
        let placed_by = placed_by.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.place_hold(hold_type, qty, reason.clone(), placed_by.clone(), None)?;
                Ok(None)
            }),
        )
        .await
    }

    pub async fn release_hold(&self, sku: &str, hold_id: Uuid, released_by: impl Into<String>) -> Result<ProductStock> {
        let released_by = released_by.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.release_hold(hold_id, released_by.clone())?;
                Ok(None)
            }),
        )
        .await
    }

    pub async fn change_stock_status(
        &self,
        sku: &str,
        from: StockStatus,
        to: StockStatus,
        qty: i64,
        reason: impl Into<String>,
    ) -> Result<ProductStock> {
        let reason = reason.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.change_stock_status(from, to, qty, reason.clone(), None)?;
                Ok(None)
            }),
        )
        .await
    }

    pub async fn revalue(&self, sku: &str, method: ValuationMethod, new_unit_cost: Decimal, currency: impl Into<String>, reason: impl Into<String>) -> Result<ProductStock> {
        let currency = currency.into();
        let reason = reason.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.revalue(method, new_unit_cost, currency.clone(), reason.clone())?;
                Ok(None)
            }),
        )
        .await
    }

    pub async fn reclassify(&self, sku: &str, new_class: AbcClass, criteria: impl Into<String>, annual_usage_value: Decimal, reason: impl Into<String>) -> Result<ProductStock> {
        let criteria = criteria.into();
        let reason = reason.into();
        self.execute(
            sku,
            false,
            Box::new(move |stock| {
                stock.reclassify(new_class, criteria.clone(), annual_usage_value, reason.clone())?;
                Ok(None)
            }),
        )
        .await
    }

    /// `recordSerial(sku, serial)` — serials are independent entities with a
    /// weak sku reference (spec §3.2); they bypass `execute()`'s CAS/retry
    /// loop entirely since they don't share `ProductStock`'s version column.
    pub async fn record_serial(&self, sku: &str, serial: impl Into<String>) -> Result<SerialNumber> {
        let (entity, event) = SerialNumber::record(sku, serial);
        self.serials.save(&entity).await?;
        let row = OutboxEvent::from_domain_event(&event).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        self.outbox.insert(row).await?;
        Ok(entity)
    }

    pub async fn allocate_serial(&self, serial: &str, order_id: impl Into<String>) -> Result<SerialNumber> {
        let mut entity = self
            .serials
            .find(serial)
            .await?
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("serial {serial} not found")))?;
        let event = entity.allocate(order_id)?;
        self.serials.save(&entity).await?;
        let row = OutboxEvent::from_domain_event(&event).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        self.outbox.insert(row).await?;
        Ok(entity)
    }

    pub async fn ship_serial(&self, serial: &str) -> Result<SerialNumber> {
        let mut entity = self
            .serials
            .find(serial)
            .await?
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("serial {serial} not found")))?;
        let event = entity.ship()?;
        self.serials.save(&entity).await?;
        let row = OutboxEvent::from_domain_event(&event).map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        self.outbox.insert(row).await?;
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_service::NoopCacheInvalidator;
    use crate::repo_memory::{InMemoryOutboxRepository, InMemoryProductStockRepository, InMemorySerialNumberRepository};

    fn service() -> CommandService {
        CommandService::new(
            Arc::new(InMemoryProductStockRepository::default()),
            Arc::new(InMemorySerialNumberRepository::default()),
            Arc::new(InMemoryOutboxRepository::default()),
            Arc::new(NoopCacheInvalidator),
            CommandRetryConfig::default(),
        )
    }

    #[tokio::test]
    async fn receipt_then_query_scenario_1() {
        let service = service();
        let stock = service.adjust_stock("SKU-A", 100, ReasonCode::PurchaseReceipt, None).await.unwrap();
        assert_eq!(stock.stock_level.quantity_on_hand, 100);
        assert_eq!(stock.available_to_promise(), 100);
    }

    #[tokio::test]
    async fn allocate_missing_sku_fails_not_found() {
        let service = service();
        let err = service.allocate("SKU-MISSING", 10, "ORD-1").await.unwrap_err();
        assert!(matches!(err, LedgerError::ProductStockNotFound(_)));
    }

    #[tokio::test]
    async fn allocate_then_deallocate_round_trip() {
        let service = service();
        service.adjust_stock("SKU-A", 100, ReasonCode::PurchaseReceipt, None).await.unwrap();
        service.allocate("SKU-A", 10, "ORD-1").await.unwrap();
        let stock = service.deallocate("SKU-A", 10, "ORD-1").await.unwrap();
        assert_eq!(stock.stock_level.quantity_allocated, 0);
    }

    #[tokio::test]
    async fn serial_lifecycle_record_allocate_ship() {
        let service = service();
        let serial = service.record_serial("SKU-A", "SN-1").await.unwrap();
        assert_eq!(serial.status, crate::domain::SerialStatus::Received);

        let serial = service.allocate_serial("SN-1", "ORD-1").await.unwrap();
        assert_eq!(serial.status, crate::domain::SerialStatus::Allocated);

        let serial = service.ship_serial("SN-1").await.unwrap();
        assert_eq!(serial.status, crate::domain::SerialStatus::Shipped);
    }

    #[tokio::test]
    async fn allocate_serial_fails_for_unknown_serial() {
        let service = service();
        let err = service.allocate_serial("SN-MISSING", "ORD-1").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
    }

    #[derive(Default)]
    struct CountingInvalidator {
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl CacheInvalidator for CountingInvalidator {
        fn invalidate(&self, sku: &str) {
            self.calls.lock().unwrap().push(sku.to_string());
        }
    }

    #[tokio::test]
    async fn successful_commit_invalidates_cache_for_sku() {
        let cache = Arc::new(CountingInvalidator::default());
        let service = CommandService::new(
            Arc::new(InMemoryProductStockRepository::default()),
            Arc::new(InMemorySerialNumberRepository::default()),
            Arc::new(InMemoryOutboxRepository::default()),
            cache.clone(),
            CommandRetryConfig::default(),
        );
        service.adjust_stock("SKU-A", 50, ReasonCode::PurchaseReceipt, None).await.unwrap();
        assert_eq!(cache.calls.lock().unwrap().as_slice(), ["SKU-A"]);
    }
}
