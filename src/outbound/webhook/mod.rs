// Webhook delivery module
//
// Leaf components (no dependency on the orchestrator):
//   hmac_signer, http_client, retry_strategy, schemas
//
// Collaborator implementations (in-memory):
//   delivery_log       – DeliveryRecorder with bounded history
//   subscription_store – SubscriptionStore, optionally seeded from JSON
//
// Orchestration:
//   delivery_service – signs once, attempts, backs off, records the outcome

pub mod delivery_log;
pub mod delivery_service;
pub mod hmac_signer;
pub mod http_client;
pub mod retry_strategy;
pub mod schemas;
pub mod subscription_store;

// Re-export commonly used types
pub use delivery_log::DeliveryLog;
pub use delivery_service::{DeliveryError, DeliveryService, DeliveryServiceError, RejectionReason};
pub use hmac_signer::{
    HmacSigner, SigningError, format_signature_header, parse_signature_header, sign,
};
pub use http_client::{HttpClientError, WebhookHttpClient};
pub use retry_strategy::{RetryStrategy, TokioSleeper};
pub use schemas::{CanonicalPayload, DispatchSummary, PayloadError, WebhookPayload};
pub use subscription_store::InMemorySubscriptionStore;
