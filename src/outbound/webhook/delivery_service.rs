use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DeliveryConfig;
use crate::domain::delivery::{DeliveryAttempt, DeliveryOutcome, DeliveryRecord, DeliveryState};
use crate::domain::events::{EventNotification, NotificationRequest};
use crate::domain::ports::{
    DeliveryRecorder, DeliveryTransport, Sleeper, StoreError, SubscriptionStore,
};
use crate::domain::subscription::WebhookSubscription;
use crate::outbound::webhook::hmac_signer::{HmacSigner, SigningError};
use crate::outbound::webhook::http_client::WebhookHttpClient;
use crate::outbound::webhook::retry_strategy::{RetryStrategy, TokioSleeper};
use crate::outbound::webhook::schemas::{CanonicalPayload, DispatchSummary, PayloadError};

/// Drives one notification through signing, attempts and backoff.
///
/// Each call to [`DeliveryService::deliver`] is an independent sequence that
/// owns its payload, signature and attempt log; many can run concurrently on
/// one service. The only suspension points are the backoff sleep and the
/// network call, and both race against the caller's cancellation token.
pub struct DeliveryService {
    /// Source of subscription records, read-only.
    subscriptions: Arc<dyn SubscriptionStore>,

    /// Write-only sink for attempts, outcomes and last-triggered updates.
    recorder: Arc<dyn DeliveryRecorder>,

    /// Single-attempt HTTP transport.
    transport: Arc<dyn DeliveryTransport>,

    /// Suspension between attempts.
    sleeper: Arc<dyn Sleeper>,

    retry_strategy: RetryStrategy,
}

impl DeliveryService {
    /// Create a `DeliveryService` with the HTTP transport and tokio sleeper.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        recorder: Arc<dyn DeliveryRecorder>,
        config: &DeliveryConfig,
    ) -> Result<Self, DeliveryServiceError> {
        let http_client =
            WebhookHttpClient::with_settings(&config.user_agent, config.max_response_body_bytes)
                .map_err(|e| DeliveryServiceError::Initialisation(e.to_string()))?;

        let retry_strategy = RetryStrategy::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        );

        Ok(Self {
            subscriptions,
            recorder,
            transport: Arc::new(http_client),
            sleeper: Arc::new(TokioSleeper),
            retry_strategy,
        })
    }

    /// Override the transport.
    pub fn with_transport(mut self, transport: Arc<dyn DeliveryTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Override how the sequence waits between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Override the retry strategy.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Resolve the subscription named by `request` and deliver to it.
    pub async fn dispatch(
        &self,
        request: NotificationRequest,
        cancel: &CancellationToken,
    ) -> Result<DispatchSummary, DeliveryError> {
        let subscription = self
            .subscriptions
            .find(&request.webhook_id)
            .await?
            .ok_or_else(|| DeliveryError::SubscriptionNotFound(request.webhook_id.clone()))?;

        let notification = request.into_notification();
        let outcome = self.deliver(&subscription, &notification, cancel).await?;

        Ok(DispatchSummary::from(&outcome))
    }

    /// Run [`DeliveryService::dispatch`] on its own task.
    ///
    /// The sequence keeps going if the caller stops polling the handle; only
    /// `cancel` stops it early.
    pub fn spawn_dispatch(
        self: Arc<Self>,
        request: NotificationRequest,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<DispatchSummary, DeliveryError>> {
        tokio::spawn(async move { self.dispatch(request, &cancel).await })
    }

    /// Deliver one notification to one subscription.
    ///
    /// Returns `Err` only for precondition failures, before any attempt is
    /// made. Exhaustion and cancellation are failed outcomes, not errors.
    pub async fn deliver(
        &self,
        subscription: &WebhookSubscription,
        notification: &EventNotification,
        cancel: &CancellationToken,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        check_preconditions(subscription, notification)?;

        let payload = CanonicalPayload::build(&subscription.id, notification)?;
        let signature = HmacSigner::new(&subscription.secret)?.sign(payload.as_slice())?;
        let delivery_id = payload.delivery_id();
        let max_backoff_ms = u64::try_from(
            self.retry_strategy
                .total_backoff(subscription.attempt_budget())
                .as_millis(),
        )
        .unwrap_or(u64::MAX);

        info!(
            subscription_id = %subscription.id,
            delivery_id = %delivery_id,
            event_type = %notification.event_type,
            max_attempts = subscription.attempt_budget(),
            max_backoff_ms = max_backoff_ms,
            "Starting webhook delivery"
        );

        let (state, attempt_log) = self
            .run_attempts(subscription, &payload, &signature, cancel)
            .await;

        let now = OffsetDateTime::now_utc();
        let outcome = DeliveryOutcome::conclude(
            delivery_id,
            subscription.id.clone(),
            state,
            attempt_log,
            now,
        );

        match outcome.state {
            DeliveryState::Succeeded => info!(
                subscription_id = %subscription.id,
                delivery_id = %delivery_id,
                attempts = outcome.attempts,
                status_code = outcome.status,
                "Webhook delivered successfully"
            ),
            DeliveryState::Cancelled => warn!(
                subscription_id = %subscription.id,
                delivery_id = %delivery_id,
                attempts = outcome.attempts,
                "Webhook delivery cancelled"
            ),
            _ => error!(
                subscription_id = %subscription.id,
                delivery_id = %delivery_id,
                attempts = outcome.attempts,
                status_code = outcome.status,
                "Webhook delivery permanently failed"
            ),
        }

        self.finalize(&outcome, &notification.event_type, &payload, now)
            .await;

        Ok(outcome)
    }

    /// State machine: Pending → Attempting → BackingOff → … → terminal.
    async fn run_attempts(
        &self,
        subscription: &WebhookSubscription,
        payload: &CanonicalPayload,
        signature: &str,
        cancel: &CancellationToken,
    ) -> (DeliveryState, Vec<DeliveryAttempt>) {
        let max_attempts = subscription.attempt_budget();
        let timeout = subscription.timeout();
        let mut attempt_log: Vec<DeliveryAttempt> = Vec::new();
        let mut state = DeliveryState::Pending;

        while !state.is_terminal() {
            state = match state {
                DeliveryState::Pending => DeliveryState::Attempting { attempt: 1 },

                DeliveryState::BackingOff { next_attempt } => {
                    let delay = self.retry_strategy.delay_before_attempt(next_attempt);
                    debug!(
                        subscription_id = %subscription.id,
                        next_attempt = next_attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Backing off before retry"
                    );

                    if cancel.is_cancelled() {
                        DeliveryState::Cancelled
                    } else {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => DeliveryState::Cancelled,
                            _ = self.sleeper.sleep(delay) => DeliveryState::Attempting { attempt: next_attempt },
                        }
                    }
                }

                DeliveryState::Attempting { attempt } => {
                    if cancel.is_cancelled() {
                        DeliveryState::Cancelled
                    } else {
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            result = self.transport.attempt(
                                &subscription.url,
                                payload.bytes(),
                                signature,
                                payload.timestamp(),
                                timeout,
                            ) => Some(result),
                        };

                        match result {
                            // In-flight request dropped; not counted.
                            None => DeliveryState::Cancelled,
                            Some(result) => {
                                let record = DeliveryAttempt::from_result(attempt, result);
                                let next = next_state(&record, attempt, max_attempts);

                                if !record.is_success() {
                                    warn!(
                                        subscription_id = %subscription.id,
                                        delivery_id = %payload.delivery_id(),
                                        attempt = attempt,
                                        max_attempts = max_attempts,
                                        status_code = record.status_code(),
                                        elapsed_ms = record.elapsed_ms,
                                        "Webhook delivery attempt failed"
                                    );
                                }

                                self.record_attempt(payload, &subscription.id, &record)
                                    .await;
                                attempt_log.push(record);
                                next
                            }
                        }
                    }
                }

                terminal => terminal,
            };
        }

        (state, attempt_log)
    }

    async fn record_attempt(
        &self,
        payload: &CanonicalPayload,
        subscription_id: &str,
        attempt: &DeliveryAttempt,
    ) {
        if let Err(e) = self
            .recorder
            .record_attempt(payload.delivery_id(), subscription_id, attempt)
            .await
        {
            warn!(
                recorder = self.recorder.name(),
                delivery_id = %payload.delivery_id(),
                error = %e,
                "Failed to record delivery attempt"
            );
        }
    }

    /// Hand the final record and the last-triggered update to the recorder.
    async fn finalize(
        &self,
        outcome: &DeliveryOutcome,
        event_type: &str,
        payload: &CanonicalPayload,
        now: OffsetDateTime,
    ) {
        let record = DeliveryRecord::from_outcome(outcome, event_type, payload.to_text());

        if let Err(e) = self.recorder.record_outcome(record).await {
            warn!(
                recorder = self.recorder.name(),
                delivery_id = %outcome.delivery_id,
                error = %e,
                "Failed to record delivery outcome"
            );
        }

        // Last-triggered only moves when something was actually sent.
        if outcome.attempt_log.is_empty() {
            return;
        }

        if let Err(e) = self
            .recorder
            .touch_subscription(&outcome.subscription_id, now)
            .await
        {
            warn!(
                recorder = self.recorder.name(),
                subscription_id = %outcome.subscription_id,
                error = %e,
                "Failed to update last triggered timestamp"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject deliveries that must never reach the network.
fn check_preconditions(
    subscription: &WebhookSubscription,
    notification: &EventNotification,
) -> Result<(), DeliveryError> {
    if !subscription.is_active {
        debug!(subscription_id = %subscription.id, "Subscription inactive");
        return Err(DeliveryError::Rejected(RejectionReason::Inactive));
    }

    if !subscription.is_subscribed_to(&notification.event_type) {
        debug!(
            subscription_id = %subscription.id,
            event_type = %notification.event_type,
            "Event type not subscribed"
        );
        return Err(DeliveryError::Rejected(RejectionReason::EventNotSubscribed(
            notification.event_type.clone(),
        )));
    }

    Ok(())
}

/// Every non-2xx result is retried while budget remains.
fn next_state(attempt: &DeliveryAttempt, index: u32, max_attempts: u32) -> DeliveryState {
    if attempt.is_success() {
        DeliveryState::Succeeded
    } else if index >= max_attempts {
        DeliveryState::Exhausted
    } else {
        DeliveryState::BackingOff {
            next_attempt: index + 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a delivery was refused before any attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    Inactive,
    EventNotSubscribed(String),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Inactive => f.write_str("subscription is inactive"),
            RejectionReason::EventNotSubscribed(event_type) => {
                write!(f, "event type {event_type} is not subscribed")
            }
        }
    }
}

/// Precondition failures surfaced to the caller of `deliver`/`dispatch`.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery rejected: {0}")]
    Rejected(RejectionReason),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Delivery task failed: {0}")]
    TaskFailed(String),
}

/// Errors that can occur during `DeliveryService` initialisation.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryServiceError {
    #[error("Initialisation failed: {0}")]
    Initialisation(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
