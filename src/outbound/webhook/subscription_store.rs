use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::ports::{StoreError, SubscriptionStore};
use crate::domain::subscription::WebhookSubscription;

/// Subscription records held in memory, keyed by id.
///
/// Stands in for the management collaborator; records are replaced whole.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<HashMap<String, WebhookSubscription>>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<WebhookSubscription>) -> Self {
        let map = subscriptions
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        Self {
            subscriptions: Arc::new(RwLock::new(map)),
        }
    }

    /// Load a JSON array of subscriptions from disk
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::LoadFailed(format!("{}: {e}", path.display())))?;

        let subscriptions: Vec<WebhookSubscription> = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::LoadFailed(format!("{}: {e}", path.display())))?;

        info!(
            count = subscriptions.len(),
            path = %path.display(),
            "Loaded webhook subscriptions"
        );

        Ok(Self::with_subscriptions(subscriptions))
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find(&self, subscription_id: &str) -> Result<Option<WebhookSubscription>, StoreError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.get(subscription_id).cloned())
    }
}
