// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/event_ingest.rs
// Description: Event ingest (C12) — consumes externally produced events
//              (receipt, pick, quality, damage) and dispatches them to the
//              command service. Malformed payloads are dead-lettered and
//              acked rather than retried forever (spec §7, SchemaValidation).
// ============================================================================

use serde::Deserialize;
use tracing::warn;

use crate::command_service::CommandService;
use crate::domain::ReasonCode;
use crate::error::{LedgerError, Result};

/// Ingested event types (symmetric envelope), per spec §6.2:
/// `*.item.picked`, `*.stock-added-to-location`,
/// `*.inventory.allocation.requested`, `*.quality-inspection.completed`,
/// `*.damage.reported`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IngestedEvent {
    #[serde(rename = "item.picked")]
    ItemPicked { sku: String, quantity: i64, order_id: String },

    #[serde(rename = "stock-added-to-location")]
    StockAddedToLocation { sku: String, quantity: i64, receipt_id: Option<String> },

    #[serde(rename = "inventory.allocation.requested")]
    AllocationRequested { sku: String, quantity: i64, order_id: String },

    #[serde(rename = "quality-inspection.completed")]
    QualityInspectionCompleted { sku: String, quantity: i64, passed: bool },

    #[serde(rename = "damage.reported")]
    DamageReported { sku: String, quantity: i64, reason: String },
}

pub struct EventIngestService {
    command_service: std::sync::Arc<CommandService>,
}

impl EventIngestService {
    pub fn new(command_service: std::sync::Arc<CommandService>) -> Self {
        Self { command_service }
    }

    /// Parses and dispatches one raw ingested payload. A `SchemaValidation`
    /// error means the caller should dead-letter and ack the message rather
    /// than redeliver it (spec §7 — malformed payloads must not poison-loop
    /// the consumer).
    pub async fn handle_raw(&self, raw: &serde_json::Value) -> Result<()> {
        let event: IngestedEvent = serde_json::from_value(raw.clone())
            .map_err(|err| LedgerError::SchemaValidation(err.to_string()))?;
        self.handle(event).await
    }

    pub async fn handle(&self, event: IngestedEvent) -> Result<()> {
        match event {
            IngestedEvent::ItemPicked { sku, quantity, order_id } => {
                self.command_service.process_item_picked(&sku, quantity, order_id).await?;
            }
            IngestedEvent::StockAddedToLocation { sku, quantity, receipt_id } => {
                self.command_service.receive_stock(&sku, quantity, receipt_id).await?;
            }
            IngestedEvent::AllocationRequested { sku, quantity, order_id } => {
                self.command_service.allocate(&sku, quantity, order_id).await?;
            }
            IngestedEvent::QualityInspectionCompleted { sku, quantity, passed } => {
                let (from, to) = if passed {
                    (crate::domain::StockStatus::Quarantine, crate::domain::StockStatus::Available)
                } else {
                    (crate::domain::StockStatus::Quarantine, crate::domain::StockStatus::Damaged)
                };
                self.command_service
                    .change_stock_status(&sku, from, to, quantity, "QUALITY_INSPECTION_COMPLETED")
                    .await?;
            }
            IngestedEvent::DamageReported { sku, quantity, reason } => {
                let result = self
                    .command_service
                    .adjust_stock(&sku, -quantity, ReasonCode::Damage, None)
                    .await;
                if result.is_err() {
                    warn!(sku, reason, "damage report could not be fully applied via adjustment; falling back to status move");
                    self.command_service
                        .change_stock_status(&sku, crate::domain::StockStatus::Available, crate::domain::StockStatus::Damaged, quantity, reason)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_service::CommandRetryConfig;
    use crate::query_service::NoopCacheInvalidator;
    use crate::repo_memory::{InMemoryOutboxRepository, InMemoryProductStockRepository, InMemorySerialNumberRepository};
    use std::sync::Arc;

    async fn ingest_with_seed(sku: &str, qty: i64, allocated: i64) -> EventIngestService {
        let repo = Arc::new(InMemoryProductStockRepository::default());
        let service = Arc::new(CommandService::new(
            repo,
            Arc::new(InMemorySerialNumberRepository::default()),
            Arc::new(InMemoryOutboxRepository::default()),
            Arc::new(NoopCacheInvalidator),
            CommandRetryConfig::default(),
        ));
        service.adjust_stock(sku, qty, ReasonCode::PurchaseReceipt, None).await.unwrap();
        if allocated > 0 {
            service.allocate(sku, allocated, "ORD-SEED").await.unwrap();
        }
        EventIngestService::new(service)
    }

    #[tokio::test]
    async fn item_picked_decrements_both_scenario_4() {
        let ingest = ingest_with_seed("SKU-A", 100, 30).await;
        ingest
            .handle(IngestedEvent::ItemPicked { sku: "SKU-A".into(), quantity: 30, order_id: "O1".into() })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_is_schema_validation_error() {
        let ingest = ingest_with_seed("SKU-A", 10, 0).await;
        let bad = serde_json::json!({"type": "item.picked", "data": {"sku": "SKU-A"}});
        let err = ingest.handle_raw(&bad).await.unwrap_err();
        assert!(matches!(err, LedgerError::SchemaValidation(_)));
    }
}
