use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::domain::delivery::DeliveryOutcome;
use crate::domain::events::EventNotification;

/// Error type for building the canonical payload
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Failed to serialize webhook payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2025-03-01T09:30:00.000Z`
pub fn iso_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
}

/// Webhook payload sent to receivers. Field order is the wire order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    pub id: Uuid,

    pub event_type: String,

    pub data: Value,

    pub timestamp: String,

    pub webhook_id: String,
}

impl WebhookPayload {
    /// Payload for one delivery with a fresh delivery id, stamped `now`
    pub fn new(
        webhook_id: &str,
        notification: &EventNotification,
        now: OffsetDateTime,
    ) -> Result<Self, PayloadError> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_type: notification.event_type.clone(),
            data: notification.data.clone(),
            timestamp: iso_timestamp(now)?,
            webhook_id: webhook_id.to_string(),
        })
    }
}

/// The exact bytes that are signed and transmitted.
///
/// Serialized once; every consumer reads the same buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPayload {
    delivery_id: Uuid,
    timestamp: String,
    bytes: Bytes,
}

impl CanonicalPayload {
    pub fn from_payload(payload: &WebhookPayload) -> Result<Self, PayloadError> {
        let bytes = serde_json::to_vec(payload)?;

        Ok(Self {
            delivery_id: payload.id,
            timestamp: payload.timestamp.clone(),
            bytes: Bytes::from(bytes),
        })
    }

    /// Build and serialize the payload for `webhook_id` in one step
    pub fn build(webhook_id: &str, notification: &EventNotification) -> Result<Self, PayloadError> {
        let payload = WebhookPayload::new(webhook_id, notification, OffsetDateTime::now_utc())?;
        Self::from_payload(&payload)
    }

    pub fn delivery_id(&self) -> Uuid {
        self.delivery_id
    }

    /// Timestamp embedded in the payload, reused verbatim as a header
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Cheap handle on the shared buffer
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Summary returned to the caller of the trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchSummary {
    pub success: bool,

    pub status: u16,

    pub attempts: u32,

    pub webhook_id: String,
}

impl From<&DeliveryOutcome> for DispatchSummary {
    fn from(outcome: &DeliveryOutcome) -> Self {
        Self {
            success: outcome.success,
            status: outcome.status,
            attempts: outcome.attempts,
            webhook_id: outcome.subscription_id.clone(),
        }
    }
}
