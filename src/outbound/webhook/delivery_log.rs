use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::delivery::{DeliveryAttempt, DeliveryRecord};
use crate::domain::ports::{DeliveryRecorder, RecorderError};

/// In-memory delivery recorder.
///
/// Keeps the attempt log of each delivery, a bounded list of final records per
/// subscription, and the last-triggered time of each subscription.
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    /// Attempts per delivery id, appended as they complete
    attempts: Arc<RwLock<HashMap<Uuid, Vec<DeliveryAttempt>>>>,

    /// Final records per subscription, oldest first
    records: Arc<RwLock<HashMap<String, Vec<DeliveryRecord>>>>,

    last_triggered: Arc<RwLock<HashMap<String, OffsetDateTime>>>,

    /// Maximum records to keep per subscription
    max_history_per_subscription: usize,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::with_history_limit(100)
    }

    /// Create a log with custom history limit
    pub fn with_history_limit(max_history_per_subscription: usize) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            records: Arc::new(RwLock::new(HashMap::new())),
            last_triggered: Arc::new(RwLock::new(HashMap::new())),
            max_history_per_subscription,
        }
    }

    /// Attempts recorded for a delivery, in order
    pub async fn attempts_for(&self, delivery_id: Uuid) -> Vec<DeliveryAttempt> {
        let attempts = self.attempts.read().await;
        attempts.get(&delivery_id).cloned().unwrap_or_default()
    }

    /// Final records for a subscription, oldest first
    pub async fn records_for(&self, subscription_id: &str) -> Vec<DeliveryRecord> {
        let records = self.records.read().await;
        records.get(subscription_id).cloned().unwrap_or_default()
    }

    pub async fn latest_record(&self, subscription_id: &str) -> Option<DeliveryRecord> {
        let records = self.records.read().await;
        records.get(subscription_id).and_then(|r| r.last().cloned())
    }

    pub async fn last_triggered(&self, subscription_id: &str) -> Option<OffsetDateTime> {
        let last_triggered = self.last_triggered.read().await;
        last_triggered.get(subscription_id).copied()
    }
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryRecorder for DeliveryLog {
    async fn record_attempt(
        &self,
        delivery_id: Uuid,
        subscription_id: &str,
        attempt: &DeliveryAttempt,
    ) -> Result<(), RecorderError> {
        debug!(
            delivery_id = %delivery_id,
            subscription_id = %subscription_id,
            attempt = attempt.attempt,
            status_code = attempt.status_code(),
            "Recording delivery attempt"
        );

        let mut attempts = self.attempts.write().await;
        attempts.entry(delivery_id).or_default().push(attempt.clone());
        Ok(())
    }

    async fn record_outcome(&self, record: DeliveryRecord) -> Result<(), RecorderError> {
        let evicted: Vec<Uuid> = {
            let mut records = self.records.write().await;
            let entries = records.entry(record.subscription_id.clone()).or_default();
            entries.push(record);

            if entries.len() > self.max_history_per_subscription {
                let excess = entries.len() - self.max_history_per_subscription;
                entries.drain(0..excess).map(|r| r.delivery_id).collect()
            } else {
                Vec::new()
            }
        };

        if !evicted.is_empty() {
            let mut attempts = self.attempts.write().await;
            for delivery_id in &evicted {
                attempts.remove(delivery_id);
            }
        }

        Ok(())
    }

    async fn touch_subscription(
        &self,
        subscription_id: &str,
        triggered_at: OffsetDateTime,
    ) -> Result<(), RecorderError> {
        let mut last_triggered = self.last_triggered.write().await;
        last_triggered.insert(subscription_id.to_string(), triggered_at);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "DeliveryLog"
    }
}
