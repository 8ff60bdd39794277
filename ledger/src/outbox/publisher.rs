// ============================================================================
// OLYMPUS CLOUD - INVENTORY LEDGER
// ============================================================================
// Module: ledger/src/outbox/publisher.rs
// Description: Outbox publisher (C9) — periodic worker that drains
//              unpublished outbox rows, emits them to the event bus, marks
//              them published, and retries with backoff. Per-aggregate
//              ordering is preserved by batching per `aggregate_id` and
//              aborting that aggregate's batch on first failure, letting
//              other aggregates proceed (spec §4.4 step 3). Modeled after
//              `spawn_outbox_consumer` in other transactional-outbox
//              implementations in this codebase's lineage.
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use olympus_shared::events::{EventBus, EventEnvelope};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::repository::OutboxRepository;

#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
    pub retention: Duration,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            retention: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// Spawns the periodic publisher task. The returned handle is owned by the
/// composition root, which supervises it (restart on panic per spec §9).
pub fn spawn_outbox_publisher(
    repository: Arc<dyn OutboxRepository>,
    bus: Arc<dyn EventBus>,
    config: OutboxPublisherConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.poll_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = publish_tick(repository.as_ref(), bus.as_ref(), config.batch_size).await {
                error!(error = %err, "outbox publish tick failed");
            }
        }
    })
}

async fn publish_tick(
    repository: &dyn OutboxRepository,
    bus: &dyn EventBus,
    batch_size: u32,
) -> crate::error::Result<()> {
    let rows = repository.fetch_unpublished(batch_size).await?;
    if rows.is_empty() {
        return Ok(());
    }

    let mut by_aggregate: HashMap<String, Vec<_>> = HashMap::new();
    for row in rows {
        by_aggregate.entry(row.aggregate_id.clone()).or_default().push(row);
    }

    for (aggregate_id, mut rows) in by_aggregate {
        rows.sort_by_key(|row| row.created_at);
        for row in rows {
            let envelope = EventEnvelope::new(row.event_type.clone(), row.aggregate_id.clone(), row.event_data.clone());
            match bus.publish(&aggregate_id, &envelope).await {
                Ok(()) => {
                    repository.mark_published(row.id, Utc::now()).await?;
                    metrics::counter!("outbox_events_published_total").increment(1);
                }
                Err(err) => {
                    warn!(%aggregate_id, event_id = %row.id, error = %err, "publish failed, stopping this aggregate's batch");
                    repository.mark_retry(row.id, row.retry_count + 1).await?;
                    metrics::counter!("outbox_events_publish_failed_total").increment(1);
                    // Per-aggregate FIFO: abort this aggregate's batch on
                    // first failure so a later row never overtakes it.
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Independent periodic task that purges published rows older than the
/// retention window (spec §4.4 step 4).
pub fn spawn_retention_sweeper(repository: Arc<dyn OutboxRepository>, retention: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::days(30));
            match repository.purge_published_before(cutoff).await {
                Ok(purged) if purged > 0 => info!(purged, "purged retained outbox rows"),
                Ok(_) => {}
                Err(err) => error!(error = %err, "outbox retention sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo_memory::InMemoryOutboxRepository;
    use async_trait::async_trait;
    use olympus_shared::events::EventBusError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventBus for RecordingBus {
        async fn publish(&self, _stream: &str, envelope: &EventEnvelope) -> Result<(), EventBusError> {
            self.published.lock().unwrap().push(envelope.subject.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_tick_marks_rows_published_in_order() {
        let repo = Arc::new(InMemoryOutboxRepository::default());
        let bus = Arc::new(RecordingBus::default());

        let row_a = crate::domain::events::EventHeader::new("SKU-A");
        let mut event = crate::outbox::OutboxEvent {
            id: uuid::Uuid::new_v4(),
            aggregate_id: "SKU-A".into(),
            event_type: "test.event".into(),
            event_data: serde_json::json!({}),
            created_at: row_a.occurred_on,
            published: false,
            published_at: None,
            retry_count: 0,
        };
        repo.insert(event.clone()).await.unwrap();
        event.id = uuid::Uuid::new_v4();
        event.created_at = event.created_at + chrono::Duration::seconds(1);
        repo.insert(event).await.unwrap();

        publish_tick(repo.as_ref(), bus.as_ref(), 10).await.unwrap();

        assert_eq!(bus.published.lock().unwrap().len(), 2);
        assert_eq!(repo.unpublished_count(), 0);
    }
}
