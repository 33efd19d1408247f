use axum::Json;
use axum::extract::State;

use crate::domain::events::NotificationRequest;
use crate::outbound::webhook::{DeliveryError, DispatchSummary};
use crate::server::AppState;
use crate::server::responses::ApiError;

/// `POST /webhook-delivery`
///
/// The sequence runs on its own task under a child of the shutdown token, so a
/// client hanging up does not abort retries already in progress.
pub async fn trigger_delivery(
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> Result<Json<DispatchSummary>, ApiError> {
    tracing::info!(
        webhook_id = %request.webhook_id,
        event_type = %request.event_type,
        "Processing webhook delivery"
    );

    let handle = state
        .delivery_service
        .clone()
        .spawn_dispatch(request, state.shutdown.child_token());

    let summary = handle
        .await
        .map_err(|e| DeliveryError::TaskFailed(e.to_string()))??;

    Ok(Json(summary))
}
