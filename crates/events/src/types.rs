//! Event types published while a launch is in flight

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A loader began a launch attempt
    #[serde(rename = "launch.started")]
    LaunchStarted { launch_id: Uuid, bundle_url: String },

    /// The debug server target was rewritten (or refused)
    #[serde(rename = "launch.debug_host")]
    DebugHostRewritten {
        launch_id: Uuid,
        debug_host: String,
        bundle_name: String,
        success: bool,
    },

    /// Lifecycle state of a launch moved forward
    #[serde(rename = "launch.state_changed")]
    StateChanged {
        launch_id: Uuid,
        from_state: String,
        to_state: String,
    },

    /// The runtime context of a launched instance finished initializing
    #[serde(rename = "launch.context_ready")]
    ContextReady { launch_id: Uuid, context_id: Uuid },

    /// The launch produced its single result
    #[serde(rename = "launch.resolved")]
    LaunchResolved { launch_id: Uuid, success: bool },

    /// The launch ended with an error; always followed by `launch.resolved`
    #[serde(rename = "launch.failed")]
    LaunchFailed { launch_id: Uuid, message: String },
}

impl Event {
    /// Get the launch this event belongs to
    pub fn launch_id(&self) -> Uuid {
        match self {
            Event::LaunchStarted { launch_id, .. }
            | Event::DebugHostRewritten { launch_id, .. }
            | Event::StateChanged { launch_id, .. }
            | Event::ContextReady { launch_id, .. }
            | Event::LaunchResolved { launch_id, .. }
            | Event::LaunchFailed { launch_id, .. } => *launch_id,
        }
    }

    /// Whether this event ends a launch
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::LaunchResolved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_creation() {
        let event = Event::LaunchStarted {
            launch_id: Uuid::new_v4(),
            bundle_url: "http://localhost:8081/index.bundle".to_string(),
        };
        let envelope = EventEnvelope::new(event);

        assert!(!envelope.id.is_nil());
        assert!(envelope.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::StateChanged {
            launch_id: Uuid::new_v4(),
            from_state: "not_started".to_string(),
            to_state: "instance_starting".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("launch.state_changed"));
        assert!(json.contains("from_state"));
        assert!(json.contains("to_state"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"launch.resolved","launch_id":"550e8400-e29b-41d4-a716-446655440000","success":true}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        match event {
            Event::LaunchResolved { launch_id, success } => {
                assert!(success);
                assert!(!launch_id.is_nil());
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_launch_id() {
        let launch_id = Uuid::new_v4();

        let event = Event::ContextReady {
            launch_id,
            context_id: Uuid::new_v4(),
        };
        assert_eq!(event.launch_id(), launch_id);
        assert!(!event.is_terminal());

        let failed = Event::LaunchFailed {
            launch_id,
            message: "timed out".to_string(),
        };
        assert_eq!(failed.launch_id(), launch_id);
        assert!(!failed.is_terminal());
    }

    #[test]
    fn test_resolved_is_terminal() {
        let event = Event::LaunchResolved {
            launch_id: Uuid::new_v4(),
            success: false,
        };
        assert!(event.is_terminal());
    }
}
