// ============================================================================
// OLYMPUS CLOUD - EVENT BUS ADAPTER
// ============================================================================
// Module: shared/src/events/publisher.rs
// Description: Thin publish-side adapter over the message bus. The
//              reliability story (at-least-once delivery, ordering,
//              retry bookkeeping) lives in the outbox itself
//              (`olympus_ledger::outbox`); this adapter only knows how to
//              push one envelope onto the wire and retry transient
//              failures a bounded number of times.
// ============================================================================

use super::{EventConfig, EventEnvelope};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("bus connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish retries exhausted for event {0}")]
    RetriesExhausted(String),
}

/// Port the outbox publisher (C9) depends on. Kept trait-object friendly so
/// tests can substitute an in-memory recorder.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, stream: &str, envelope: &EventEnvelope) -> Result<(), EventBusError>;
}

/// Redis Streams-backed bus. One stream per aggregate type keeps consumer
/// groups able to process each aggregate's events in order.
pub struct RedisEventBus {
    conn: ConnectionManager,
    config: EventConfig,
}

impl RedisEventBus {
    pub async fn connect(config: EventConfig) -> Result<Self, EventBusError> {
        let client = redis::Client::open(config.bus_url.as_str())?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, config })
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, stream: &str, envelope: &EventEnvelope) -> Result<(), EventBusError> {
        let payload = serde_json::to_string(envelope)?;
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_delay)
            .with_max_elapsed_time(Some(self.config.retry_delay * self.config.max_retries.max(1)))
            .build();

        let mut conn = self.conn.clone();
        retry(backoff, || {
            let mut conn = conn.clone();
            let stream = stream.to_string();
            let payload = payload.clone();
            let event_id = envelope.id;
            async move {
                let result: redis::RedisResult<String> = conn
                    .xadd(&stream, "*", &[("event", payload.as_str())])
                    .await;
                match result {
                    Ok(id) => {
                        debug!(%event_id, entry_id = %id, stream = %stream, "published event to bus");
                        Ok(())
                    }
                    Err(err) => {
                        warn!(%event_id, error = %err, "transient publish failure, retrying");
                        Err(backoff::Error::transient(EventBusError::Connection(err)))
                    }
                }
            }
        })
        .await
        .map_err(|_| EventBusError::RetriesExhausted(envelope.id.to_string()))?;

        let _ = &mut conn;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingBus {
        pub published: Mutex<Vec<EventEnvelope>>,
    }

    #[async_trait]
    impl EventBus for RecordingBus {
        async fn publish(&self, _stream: &str, envelope: &EventEnvelope) -> Result<(), EventBusError> {
            self.published.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn recording_bus_captures_published_envelopes() {
        let bus = RecordingBus::default();
        let envelope = EventEnvelope::new("product-stock.level-changed", "SKU-1", serde_json::json!({}));
        bus.publish("product-stock", &envelope).await.unwrap();
        assert_eq!(bus.published.lock().unwrap().len(), 1);
    }
}
