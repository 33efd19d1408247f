use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::outbound::webhook::{DeliveryError, RejectionReason};

/// Error body shared by all API error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                details,
            },
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::SubscriptionNotFound(_)
            | DeliveryError::Rejected(RejectionReason::Inactive) => {
                Self::new(StatusCode::NOT_FOUND, "Webhook not found or inactive", None)
            }
            DeliveryError::Rejected(RejectionReason::EventNotSubscribed(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "Event type not subscribed", None)
            }
            other => {
                tracing::error!(error = %other, "Webhook delivery error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    Some(other.to_string()),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
