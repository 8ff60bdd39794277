// ============================================================================
// OLYMPUS CLOUD - EVENT SYSTEM FOUNDATION
// ============================================================================
// Module: shared/src/events/mod.rs
// Description: Ambient CloudEvents-style envelope shared by every event the
//              core publishes or ingests. Domain event variants themselves
//              live in `olympus_ledger::events` (see spec §6.2 for the
//              authoritative type catalog and wire shape).
// ============================================================================

pub mod publisher;

pub use publisher::{EventBus, EventBusError, RedisEventBus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire envelope for every externally published or ingested event.
/// Field names and casing are pinned bit-exact per spec §6.2 — do not
/// rename or recase these for "consistency" with the rest of the crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub specversion: String,
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub time: DateTime<Utc>,
    pub subject: String,
    pub datacontenttype: String,
    pub data: serde_json::Value,
}

impl EventEnvelope {
    /// `source` is always this service's CloudEvents source URI; `subject`
    /// is the aggregate id (a SKU for every event type in the catalog).
    pub fn new(event_type: impl Into<String>, subject: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            specversion: "1.0".to_string(),
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            source: "/fulfillment/inventory-service".to_string(),
            time: Utc::now(),
            subject: subject.into(),
            datacontenttype: "application/json".to_string(),
            data,
        }
    }
}

/// Event bus connection and retry configuration.
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub bus_url: String,
    pub max_retries: u32,
    pub retry_delay: std::time::Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            bus_url: "redis://localhost:6379".to_string(),
            max_retries: 3,
            retry_delay: std::time::Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_pins_cloudevents_shape() {
        let envelope = EventEnvelope::new(
            "com.paklog.inventory.fulfillment.v1.product-stock.level-changed",
            "SKU-1",
            serde_json::json!({"sku": "SKU-1"}),
        );
        assert_eq!(envelope.specversion, "1.0");
        assert_eq!(envelope.datacontenttype, "application/json");

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("type").is_some());
        assert!(value.get("event_type").is_none());
    }
}
