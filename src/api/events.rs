//! Portal events and the broadcaster behind the SSE endpoint

use crate::types::{Severity, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type discriminant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    /// Ticket filed
    TicketCreated {
        ticket_id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        student_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Ticket moved to a new status
    TicketStatusChanged {
        ticket_id: String,
        status: TicketStatus,
        timestamp: DateTime<Utc>,
    },
    /// Notification raised for staff or a student
    NotificationCreated {
        notification_id: String,
        title: String,
        kind: Severity,
        timestamp: DateTime<Utc>,
    },
    /// Procedure added, edited or removed
    ProcedureChanged {
        procedure_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Server started; the envelope carries the instance id
    SessionStarted { timestamp: DateTime<Utc> },
    /// Heartbeat (published periodically)
    Heartbeat { timestamp: DateTime<Utc> },
}

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event ID (for deduplication)
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(flatten)]
    pub event_type: EventType,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: None,
            event_type,
        }
    }

    pub fn ticket_created(ticket_id: String, title: String, student_id: Option<String>) -> Self {
        Self::new(EventType::TicketCreated {
            ticket_id,
            title,
            student_id,
            timestamp: Utc::now(),
        })
    }

    pub fn ticket_status_changed(ticket_id: String, status: TicketStatus) -> Self {
        Self::new(EventType::TicketStatusChanged {
            ticket_id,
            status,
            timestamp: Utc::now(),
        })
    }

    pub fn notification_created(notification_id: String, title: String, kind: Severity) -> Self {
        Self::new(EventType::NotificationCreated {
            notification_id,
            title,
            kind,
            timestamp: Utc::now(),
        })
    }

    pub fn procedure_changed(procedure_id: String) -> Self {
        Self::new(EventType::ProcedureChanged {
            procedure_id,
            timestamp: Utc::now(),
        })
    }

    pub fn session_started(instance_id: String) -> Self {
        Self::new(EventType::SessionStarted {
            timestamp: Utc::now(),
        })
        .with_instance(instance_id)
    }

    pub fn heartbeat(instance_id: String) -> Self {
        Self::new(EventType::Heartbeat {
            timestamp: Utc::now(),
        })
        .with_instance(instance_id)
    }

    fn with_instance(mut self, instance_id: String) -> Self {
        self.instance_id = Some(instance_id);
        self
    }
}

/// Event broadcaster using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    /// Create new broadcaster with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast event to all subscribers
    pub fn broadcast(
        &self,
        event: Event,
    ) -> Result<usize, Box<broadcast::error::SendError<Event>>> {
        self.tx.send(event).map_err(Box::new)
    }

    /// Publish, ignoring the no-subscriber case
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = Event::ticket_status_changed("42".to_string(), TicketStatus::Rejected);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ticket_status_changed");
        assert_eq!(json["ticket_id"], "42");
        assert_eq!(json["status"], "Từ chối");
        assert!(json.get("instance_id").is_none());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_heartbeat_names_instance_once() {
        let event = Event::heartbeat("node-1".to_string());
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(text.matches("\"instance_id\"").count(), 1);

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["instance_id"], "node-1");

        let back: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_broadcast_to_subscriber() {
        let broadcaster = EventBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let event = Event::procedure_changed("proc_1".to_string());
        broadcaster.broadcast(event.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = EventBroadcaster::default();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(broadcaster
            .broadcast(Event::heartbeat("i".to_string()))
            .is_err());
        broadcaster.publish(Event::heartbeat("i".to_string()));
    }
}
