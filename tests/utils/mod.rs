use presto_webhooks::{config::Config, server::Server};
use serde_json::Value;
use std::io::Write;
use tokio_util::sync::CancellationToken;

pub struct TestServer {
    pub addr: String,
    pub shutdown: CancellationToken,
}

/// Spawn the server on a random port with no subscriptions.
pub async fn spawn_server() -> String {
    spawn_server_with_subscriptions(Vec::new()).await.addr
}

/// Spawn the server with the given subscription records and 1ms backoff.
pub async fn spawn_server_with_subscriptions(subscriptions: Vec<Value>) -> TestServer {
    let mut seed = tempfile::NamedTempFile::new().unwrap();
    seed.write_all(serde_json::to_string(&subscriptions).unwrap().as_bytes())
        .unwrap();

    let config = {
        let mut config = Config::load().unwrap();
        config.server.host = "localhost".to_string();
        config.server.port = 0;
        config.delivery.backoff_base_ms = 1;
        config.delivery.backoff_max_ms = 5;
        config.subscriptions.seed_file = Some(seed.path().display().to_string());
        config
    };

    let server = Server::new(&config).await.unwrap();

    let port = server.port().unwrap();
    let shutdown = server.shutdown_token();
    tokio::spawn(server.run());

    TestServer {
        addr: format!("http://{}:{}", config.server.host, port),
        shutdown,
    }
}
