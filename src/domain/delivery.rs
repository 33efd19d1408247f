use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// How a single HTTP exchange ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The receiver answered; any status code, captured verbatim.
    Responded { status_code: u16 },

    /// The per-attempt timeout elapsed before the exchange completed.
    TimedOut,

    /// Connect, TLS or read failure before a full response was obtained.
    NetworkError,
}

impl AttemptStatus {
    /// HTTP status, or 0 when the receiver was never reached.
    pub fn status_code(&self) -> u16 {
        match self {
            AttemptStatus::Responded { status_code } => *status_code,
            AttemptStatus::TimedOut | AttemptStatus::NetworkError => 0,
        }
    }

    /// Only a 2xx response counts as delivered.
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Responded { status_code } if (200..300).contains(status_code))
    }
}

/// Result of one transport call, before it is numbered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub status: AttemptStatus,

    /// Bounded response body, or an error description when no response arrived.
    pub body: String,

    pub elapsed: Duration,
}

impl AttemptResult {
    pub fn responded(status_code: u16, body: String, elapsed: Duration) -> Self {
        Self {
            status: AttemptStatus::Responded { status_code },
            body,
            elapsed,
        }
    }

    pub fn timed_out(timeout: Duration, elapsed: Duration) -> Self {
        Self {
            status: AttemptStatus::TimedOut,
            body: format!("Request timeout after {timeout:?}"),
            elapsed,
        }
    }

    pub fn network_error(error: String, elapsed: Duration) -> Self {
        Self {
            status: AttemptStatus::NetworkError,
            body: error,
            elapsed,
        }
    }
}

/// One recorded HTTP exchange within a delivery sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryAttempt {
    /// 1-based attempt index
    pub attempt: u32,

    pub status: AttemptStatus,

    pub response_body: String,

    pub elapsed_ms: u64,
}

impl DeliveryAttempt {
    pub fn from_result(attempt: u32, result: AttemptResult) -> Self {
        Self {
            attempt,
            status: result.status,
            response_body: result.body,
            elapsed_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_code(&self) -> u16 {
        self.status.status_code()
    }
}

/// Position of a delivery sequence in its lifecycle.
///
/// `Succeeded`, `Exhausted` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,

    Attempting { attempt: u32 },

    BackingOff { next_attempt: u32 },

    Succeeded,

    Exhausted,

    Cancelled,
}

impl DeliveryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryState::Succeeded | DeliveryState::Exhausted | DeliveryState::Cancelled
        )
    }
}

/// Final result of one notification/subscription delivery sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivery_id: Uuid,

    pub subscription_id: String,

    pub success: bool,

    /// Status of the last attempt; 0 if it never reached the receiver.
    pub status: u16,

    pub body: String,

    pub attempts: u32,

    pub state: DeliveryState,

    pub attempt_log: Vec<DeliveryAttempt>,

    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl DeliveryOutcome {
    /// Close a sequence in the given terminal state.
    pub fn conclude(
        delivery_id: Uuid,
        subscription_id: String,
        state: DeliveryState,
        attempt_log: Vec<DeliveryAttempt>,
        now: OffsetDateTime,
    ) -> Self {
        let success = state == DeliveryState::Succeeded
            && attempt_log.last().is_some_and(DeliveryAttempt::is_success);

        let (status, body) = match attempt_log.last() {
            Some(last) => (last.status_code(), last.response_body.clone()),
            None if state == DeliveryState::Cancelled => (0, "Delivery cancelled".to_string()),
            None => (0, String::new()),
        };

        Self {
            delivery_id,
            subscription_id,
            success,
            status,
            body,
            attempts: u32::try_from(attempt_log.len()).unwrap_or(u32::MAX),
            state,
            attempt_log,
            completed_at: success.then_some(now),
        }
    }
}

/// Shape persisted through the recorder once a sequence ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub delivery_id: Uuid,

    pub subscription_id: String,

    pub event_type: String,

    /// Payload text exactly as transmitted
    pub payload: String,

    pub response_status: u16,

    pub response_body: String,

    pub attempts: u32,

    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
}

impl DeliveryRecord {
    pub fn from_outcome(outcome: &DeliveryOutcome, event_type: &str, payload: String) -> Self {
        Self {
            delivery_id: outcome.delivery_id,
            subscription_id: outcome.subscription_id.clone(),
            event_type: event_type.to_string(),
            payload,
            response_status: outcome.status,
            response_body: outcome.body.clone(),
            attempts: outcome.attempts,
            delivered_at: outcome.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(index: u32, status: AttemptStatus, body: &str) -> DeliveryAttempt {
        DeliveryAttempt {
            attempt: index,
            status,
            response_body: body.to_string(),
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_only_2xx_is_success() {
        assert!(AttemptStatus::Responded { status_code: 200 }.is_success());
        assert!(AttemptStatus::Responded { status_code: 204 }.is_success());
        assert!(AttemptStatus::Responded { status_code: 299 }.is_success());
        assert!(!AttemptStatus::Responded { status_code: 301 }.is_success());
        assert!(!AttemptStatus::Responded { status_code: 400 }.is_success());
        assert!(!AttemptStatus::Responded { status_code: 503 }.is_success());
        assert!(!AttemptStatus::TimedOut.is_success());
        assert!(!AttemptStatus::NetworkError.is_success());
    }

    #[test]
    fn test_status_code_sentinel() {
        assert_eq!(AttemptStatus::TimedOut.status_code(), 0);
        assert_eq!(AttemptStatus::NetworkError.status_code(), 0);
        assert_eq!(AttemptStatus::Responded { status_code: 418 }.status_code(), 418);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DeliveryState::Pending.is_terminal());
        assert!(!DeliveryState::Attempting { attempt: 1 }.is_terminal());
        assert!(!DeliveryState::BackingOff { next_attempt: 2 }.is_terminal());
        assert!(DeliveryState::Succeeded.is_terminal());
        assert!(DeliveryState::Exhausted.is_terminal());
        assert!(DeliveryState::Cancelled.is_terminal());
    }

    #[test]
    fn test_successful_outcome_has_completion_time() {
        let now = OffsetDateTime::now_utc();
        let outcome = DeliveryOutcome::conclude(
            Uuid::new_v4(),
            "sub-1".to_string(),
            DeliveryState::Succeeded,
            vec![
                attempt(1, AttemptStatus::Responded { status_code: 503 }, "busy"),
                attempt(2, AttemptStatus::Responded { status_code: 200 }, "ok"),
            ],
            now,
        );

        assert!(outcome.success);
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, "ok");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.completed_at, Some(now));
    }

    #[test]
    fn test_exhausted_outcome_after_timeouts_reports_zero_status() {
        let outcome = DeliveryOutcome::conclude(
            Uuid::new_v4(),
            "sub-1".to_string(),
            DeliveryState::Exhausted,
            vec![
                attempt(1, AttemptStatus::TimedOut, "timeout"),
                attempt(2, AttemptStatus::TimedOut, "timeout"),
            ],
            OffsetDateTime::now_utc(),
        );

        assert!(!outcome.success);
        assert_eq!(outcome.status, 0);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.completed_at.is_none());
    }

    #[test]
    fn test_cancelled_before_any_attempt() {
        let outcome = DeliveryOutcome::conclude(
            Uuid::new_v4(),
            "sub-1".to_string(),
            DeliveryState::Cancelled,
            vec![],
            OffsetDateTime::now_utc(),
        );

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.status, 0);
        assert_eq!(outcome.body, "Delivery cancelled");
    }

    #[test]
    fn test_record_mirrors_outcome() {
        let outcome = DeliveryOutcome::conclude(
            Uuid::new_v4(),
            "sub-1".to_string(),
            DeliveryState::Exhausted,
            vec![attempt(1, AttemptStatus::Responded { status_code: 500 }, "boom")],
            OffsetDateTime::now_utc(),
        );

        let record = DeliveryRecord::from_outcome(&outcome, "checkin.created", "{}".to_string());

        assert_eq!(record.delivery_id, outcome.delivery_id);
        assert_eq!(record.response_status, 500);
        assert_eq!(record.response_body, "boom");
        assert_eq!(record.attempts, 1);
        assert!(record.delivered_at.is_none());
    }

    #[test]
    fn test_state_serialization() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&DeliveryState::Exhausted)?,
            r#"{"state":"exhausted"}"#
        );
        assert_eq!(
            serde_json::to_string(&AttemptStatus::Responded { status_code: 200 })?,
            r#"{"kind":"responded","status_code":200}"#
        );
        Ok(())
    }
}
