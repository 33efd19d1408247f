mod utils;

use presto_webhooks::domain::subscription::WebhookSecret;
use presto_webhooks::outbound::webhook::{HmacSigner, WebhookPayload, parse_signature_header};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "whsec_checkin";

fn subscription(id: &str, url: &str, active: bool) -> Value {
    json!({
        "id": id,
        "url": url,
        "secret": SECRET,
        "event_types": ["checkin.created"],
        "timeout_seconds": 5,
        "max_attempts": 3,
        "is_active": active
    })
}

async fn trigger(addr: &str, body: Value) -> reqwest::Response {
    Client::new()
        .post(format!("{addr}/webhook-delivery"))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn test_health_check_works() {
    let addr = utils::spawn_server().await;

    let response = Client::new()
        .get(format!("{addr}/health"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn test_home_works() {
    let addr = utils::spawn_server().await;

    let response = Client::new()
        .get(format!("{addr}/"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    let body = response.text().await.expect("Failed to read response body");
    assert_eq!(body, "Presto Webhooks");
}

#[tokio::test]
async fn test_shutdown_token_stops_server() {
    let server = utils::spawn_server_with_subscriptions(Vec::new()).await;
    server.shutdown.cancel();

    let mut stopped = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if Client::new()
            .get(format!("{}/health", server.addr))
            .send()
            .await
            .is_err()
        {
            stopped = true;
            break;
        }
    }

    assert!(stopped, "server still accepting connections after shutdown");
}

#[tokio::test]
async fn test_trigger_delivers_signed_payload() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&receiver)
        .await;

    let server = utils::spawn_server_with_subscriptions(vec![subscription(
        "wh-1",
        &format!("{}/hooks", receiver.uri()),
        true,
    )])
    .await;

    let response = trigger(
        &server.addr,
        json!({"webhook_id": "wh-1", "event_type": "checkin.created", "payload": {"attendee_id": "att-7"}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(
        summary,
        json!({"success": true, "status": 200, "attempts": 1, "webhook_id": "wh-1"})
    );

    let requests = receiver.received_requests().await.unwrap();
    let request = &requests[0];

    let signature_header = request.headers.get("x-webhook-signature").unwrap().to_str().unwrap();
    let signature = parse_signature_header(signature_header).unwrap();
    HmacSigner::new(&WebhookSecret::from(SECRET))
        .unwrap()
        .verify(&request.body, signature)
        .unwrap();

    let payload: WebhookPayload = serde_json::from_slice(&request.body).unwrap();
    let timestamp = request.headers.get("x-webhook-timestamp").unwrap().to_str().unwrap();
    assert_eq!(payload.timestamp, timestamp);
    assert_eq!(payload.webhook_id, "wh-1");
    assert_eq!(payload.data, json!({"attendee_id": "att-7"}));
    assert_eq!(
        request.headers.get("user-agent").unwrap().to_str().unwrap(),
        "Presto-Webhooks/1.0"
    );
}

#[tokio::test]
async fn test_trigger_retries_until_success() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&receiver)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let server =
        utils::spawn_server_with_subscriptions(vec![subscription("wh-1", &receiver.uri(), true)])
            .await;

    let summary: Value = trigger(
        &server.addr,
        json!({"webhook_id": "wh-1", "event_type": "checkin.created", "payload": {}}),
    )
    .await
    .json()
    .await
    .unwrap();

    assert_eq!(summary["success"], true);
    assert_eq!(summary["attempts"], 3);
}

#[tokio::test]
async fn test_exhausted_delivery_is_reported_not_errored() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&receiver)
        .await;

    let server =
        utils::spawn_server_with_subscriptions(vec![subscription("wh-1", &receiver.uri(), true)])
            .await;

    let response = trigger(
        &server.addr,
        json!({"webhook_id": "wh-1", "event_type": "checkin.created", "payload": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(
        summary,
        json!({"success": false, "status": 500, "attempts": 3, "webhook_id": "wh-1"})
    );
}

#[tokio::test]
async fn test_unknown_webhook_is_not_found() {
    let server = utils::spawn_server_with_subscriptions(Vec::new()).await;

    let response = trigger(
        &server.addr,
        json!({"webhook_id": "wh-404", "event_type": "checkin.created", "payload": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Webhook not found or inactive");
}

#[tokio::test]
async fn test_inactive_webhook_is_not_found() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;

    let server =
        utils::spawn_server_with_subscriptions(vec![subscription("wh-1", &receiver.uri(), false)])
            .await;

    let response = trigger(
        &server.addr,
        json!({"webhook_id": "wh-1", "event_type": "checkin.created", "payload": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsubscribed_event_is_bad_request() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&receiver)
        .await;

    let server =
        utils::spawn_server_with_subscriptions(vec![subscription("wh-1", &receiver.uri(), true)])
            .await;

    let response = trigger(
        &server.addr,
        json!({"webhook_id": "wh-1", "event_type": "attendee.deleted", "payload": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Event type not subscribed");
}
