use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A domain event submitted for delivery (e.g. `checkin.created`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventNotification {
    pub event_type: String,

    pub data: Value,

    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

impl EventNotification {
    /// Create a notification stamped with the current time
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Inbound trigger: which subscription to notify, and with what.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRequest {
    pub webhook_id: String,

    pub event_type: String,

    #[serde(default)]
    pub payload: Value,
}

impl NotificationRequest {
    pub fn new(webhook_id: impl Into<String>, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            webhook_id: webhook_id.into(),
            event_type: event_type.into(),
            payload,
        }
    }

    /// Convert into a notification originating now.
    pub fn into_notification(self) -> EventNotification {
        EventNotification::new(self.event_type, self.payload)
    }
}
