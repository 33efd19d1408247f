use axum::http::StatusCode;

pub async fn home() -> &'static str {
    "Presto Webhooks"
}

/// Liveness probe; the delivery engine holds no connections to check.
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_home() {
        let response = home().await;
        assert_eq!(response, "Presto Webhooks");
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response, StatusCode::OK);
    }
}
