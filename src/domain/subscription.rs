use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Per-delivery timeout applied when a record does not carry one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Attempt budget applied when a record does not carry one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Shared secret used to sign payloads for one receiver.
///
/// Never printed and never serialized.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key material, only for handing to the signer.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret([REDACTED])")
    }
}

impl From<&str> for WebhookSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for WebhookSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl<'de> Deserialize<'de> for WebhookSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// A registered receiver, as supplied by the subscription collaborator.
///
/// Read-only during delivery; `last_triggered_at` is refreshed through the
/// recorder, never by mutating this value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookSubscription {
    pub id: String,

    pub url: String,

    #[serde(skip_serializing, default)]
    pub secret: WebhookSecret,

    #[serde(default)]
    pub event_types: HashSet<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_triggered_at: Option<OffsetDateTime>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_active() -> bool {
    true
}

impl WebhookSubscription {
    /// Create an active subscription with default timeout and attempt budget
    pub fn new(id: String, url: String, secret: WebhookSecret) -> Self {
        Self {
            id,
            url,
            secret,
            event_types: HashSet::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            is_active: true,
            last_triggered_at: None,
        }
    }

    /// Subscribe to specific event types
    pub fn subscribe_to(mut self, event_types: Vec<String>) -> Self {
        self.event_types = event_types.into_iter().collect();
        self
    }

    /// Exact membership test; an empty set subscribes to nothing.
    pub fn is_subscribed_to(&self, event_type: &str) -> bool {
        self.event_types.contains(event_type)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs().max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Per-attempt timeout. Zero means unset and falls back to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_seconds {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Attempt budget. Zero means unset and falls back to the default.
    pub fn attempt_budget(&self) -> u32 {
        match self.max_attempts {
            0 => DEFAULT_MAX_ATTEMPTS,
            attempts => attempts,
        }
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
