// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/bulk_allocator.rs
// Description: Bulk allocator (C8) — groups allocation requests by SKU,
//              processes per-SKU with bounded parallelism, and returns
//              per-item outcomes. Partial success is the norm (spec §4.3).
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::command_service::CommandService;
use crate::error::LedgerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub sku: String,
    pub qty: i64,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub sku: String,
    pub order_id: String,
    pub success: bool,
    pub allocated_quantity: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAllocationResult {
    pub success_count: u32,
    pub failure_count: u32,
    pub processing_ms: u64,
    pub results: Vec<AllocationOutcome>,
}

pub struct BulkAllocator {
    command_service: Arc<CommandService>,
    concurrency: usize,
}

impl BulkAllocator {
    pub fn new(command_service: Arc<CommandService>, concurrency: usize) -> Self {
        Self {
            command_service,
            concurrency: concurrency.max(1),
        }
    }

    /// Groups `requests` by SKU preserving input order within each group,
    /// then processes distinct SKUs concurrently up to `concurrency`. A
    /// single SKU's conflicting concurrent updates are handled entirely by
    /// the command service's own CAS retry loop; this allocator never
    /// retries above that (spec §4.3).
    pub async fn bulk_allocate(&self, requests: Vec<AllocationRequest>) -> BulkAllocationResult {
        let started = Instant::now();
        let total = requests.len();

        // Group by SKU for per-SKU sequential processing, but carry each
        // request's original index along so duplicate-SKU requests that were
        // interleaved in the input can be placed back in that order below —
        // grouping alone would reorder them to "all of SKU A, then all of SKU B".
        let mut order_index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<(usize, AllocationRequest)>)> = Vec::new();
        for (idx, request) in requests.into_iter().enumerate() {
            if let Some(&group_idx) = order_index.get(&request.sku) {
                groups[group_idx].1.push((idx, request));
            } else {
                order_index.insert(request.sku.clone(), groups.len());
                groups.push((request.sku.clone(), vec![(idx, request)]));
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(groups.len());

        for (sku, group) in groups {
            let semaphore = semaphore.clone();
            let command_service = self.command_service.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let mut outcomes = Vec::with_capacity(group.len());
                for (idx, request) in group {
                    let outcome = match command_service.allocate(&sku, request.qty, request.order_id.clone()).await {
                        Ok(_) => AllocationOutcome {
                            sku: request.sku.clone(),
                            order_id: request.order_id.clone(),
                            success: true,
                            allocated_quantity: Some(request.qty),
                            error_message: None,
                        },
                        Err(err) => AllocationOutcome {
                            sku: request.sku.clone(),
                            order_id: request.order_id.clone(),
                            success: false,
                            allocated_quantity: None,
                            error_message: Some(format_error(&err)),
                        },
                    };
                    outcomes.push((idx, outcome));
                }
                outcomes
            }));
        }

        let mut slots: Vec<Option<AllocationOutcome>> = (0..total).map(|_| None).collect();
        for task in tasks {
            if let Ok(outcomes) = task.await {
                for (idx, outcome) in outcomes {
                    slots[idx] = Some(outcome);
                }
            }
        }
        let results: Vec<AllocationOutcome> = slots.into_iter().flatten().collect();

        let success_count = results.iter().filter(|outcome| outcome.success).count() as u32;
        let failure_count = results.len() as u32 - success_count;

        BulkAllocationResult {
            success_count,
            failure_count,
            processing_ms: started.elapsed().as_millis() as u64,
            results,
        }
    }
}

fn format_error(err: &LedgerError) -> String {
    match err {
        LedgerError::InsufficientStock { available, requested } => {
            format!("Insufficient stock: available={available}, requested={requested}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_service::CommandRetryConfig;
    use crate::domain::ReasonCode;
    use crate::query_service::NoopCacheInvalidator;
    use crate::repo_memory::{InMemoryOutboxRepository, InMemoryProductStockRepository, InMemorySerialNumberRepository};

    async fn seeded_service() -> Arc<CommandService> {
        let repo = Arc::new(InMemoryProductStockRepository::default());
        let service = Arc::new(CommandService::new(
            repo,
            Arc::new(InMemorySerialNumberRepository::default()),
            Arc::new(InMemoryOutboxRepository::default()),
            Arc::new(NoopCacheInvalidator),
            CommandRetryConfig::default(),
        ));
        service.adjust_stock("S1", 100, ReasonCode::PurchaseReceipt, None).await.unwrap();
        service.adjust_stock("S2", 100, ReasonCode::PurchaseReceipt, None).await.unwrap();
        service.adjust_stock("S3", 15, ReasonCode::PurchaseReceipt, None).await.unwrap();
        service
    }

    #[tokio::test]
    async fn bulk_partial_success_scenario_3() {
        let service = seeded_service().await;
        let allocator = BulkAllocator::new(service, 8);

        let requests = vec![
            AllocationRequest { sku: "S1".into(), qty: 10, order_id: "O1".into() },
            AllocationRequest { sku: "S2".into(), qty: 5, order_id: "O2".into() },
            AllocationRequest { sku: "S3".into(), qty: 20, order_id: "O3".into() },
        ];

        let result = allocator.bulk_allocate(requests).await;
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        let s3 = result.results.iter().find(|r| r.sku == "S3").unwrap();
        assert!(!s3.success);
        assert_eq!(s3.error_message.as_deref(), Some("Insufficient stock: available=15, requested=20"));
    }

    #[tokio::test]
    async fn interleaved_duplicate_skus_preserve_input_order() {
        let service = seeded_service().await;
        let allocator = BulkAllocator::new(service, 8);

        let requests = vec![
            AllocationRequest { sku: "S1".into(), qty: 1, order_id: "O1".into() },
            AllocationRequest { sku: "S2".into(), qty: 1, order_id: "O2".into() },
            AllocationRequest { sku: "S1".into(), qty: 2, order_id: "O3".into() },
            AllocationRequest { sku: "S2".into(), qty: 2, order_id: "O4".into() },
        ];

        let result = allocator.bulk_allocate(requests).await;
        let order_ids: Vec<&str> = result.results.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(order_ids, vec!["O1", "O2", "O3", "O4"]);
    }
}
