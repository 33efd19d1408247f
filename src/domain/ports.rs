/*
   This module specifies the API by which the delivery engine talks to its collaborators:
   the network, the clock, the delivery record sink and the subscription source.
*/

use crate::domain::delivery::{AttemptResult, DeliveryAttempt, DeliveryRecord};
use crate::domain::subscription::WebhookSubscription;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Error type for recorder operations
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Failed to write delivery record: {0}")]
    WriteFailed(String),
}

/// Error type for subscription lookups
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to load subscriptions: {0}")]
    LoadFailed(String),
}

/// Performs exactly one signed POST. No retries, no interpretation of the status.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn attempt(
        &self,
        url: &str,
        payload: Bytes,
        signature_hex: &str,
        timestamp: &str,
        timeout: Duration,
    ) -> AttemptResult;
}

/// Suspends a delivery sequence between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Write-only sink for delivery history.
#[async_trait]
pub trait DeliveryRecorder: Send + Sync {
    /// Append one attempt as soon as it completes.
    async fn record_attempt(
        &self,
        delivery_id: Uuid,
        subscription_id: &str,
        attempt: &DeliveryAttempt,
    ) -> Result<(), RecorderError>;

    /// Persist the final record of a sequence.
    async fn record_outcome(&self, record: DeliveryRecord) -> Result<(), RecorderError>;

    /// Refresh the subscription's last-triggered timestamp. Last write wins.
    async fn touch_subscription(
        &self,
        subscription_id: &str,
        triggered_at: OffsetDateTime,
    ) -> Result<(), RecorderError>;

    fn name(&self) -> &'static str {
        "UnnamedRecorder"
    }
}

/// Read access to subscription records owned by the management collaborator.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find(&self, subscription_id: &str) -> Result<Option<WebhookSubscription>, StoreError>;
}
