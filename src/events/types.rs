//! Timeline event types

use serde::{Deserialize, Serialize};

use crate::timeline::PlanId;

/// Something changed in the source list; listeners should re-fetch and rebuild.
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// A plan write was confirmed by the repository
    PlanUpdated {
        plan_id: PlanId,
        /// ISO 8601 timestamp
        timestamp: String,
    },
}

impl TimelineEvent {
    /// Create a PlanUpdated event with the current timestamp
    pub fn plan_updated(plan_id: PlanId) -> Self {
        TimelineEvent::PlanUpdated {
            plan_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn plan_id(&self) -> PlanId {
        match self {
            TimelineEvent::PlanUpdated { plan_id, .. } => *plan_id,
        }
    }
}

/// Sink for timeline events. Emitting never blocks and never fails.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: TimelineEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_tagged() {
        let event = TimelineEvent::plan_updated(42);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "plan_updated");
        assert_eq!(json["plan_id"], 42);

        let back: TimelineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.plan_id(), 42);
    }
}
