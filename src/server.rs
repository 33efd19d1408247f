mod handlers;
mod responses;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::outbound::webhook::{DeliveryLog, DeliveryService, InMemorySubscriptionStore};
use crate::server::handlers::deliveries::trigger_delivery;
use crate::server::handlers::root::{health_check, home};
use axum::http::Method;
use axum::{
    Router,
    routing::{get, post},
};
use color_eyre::eyre::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
/// The global application state shared between all request handlers.
struct AppState {
    delivery_service: Arc<DeliveryService>,

    /// Cancelled on shutdown; each delivery runs under a child token.
    shutdown: CancellationToken,
}

pub struct Server {
    router: Router,
    listener: TcpListener,
    shutdown: CancellationToken,
}

impl Server {
    /// Creates a new HTTP server.
    pub async fn new(config: &Config) -> Result<Self> {
        let trace_layer =
            TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("request", method = %request.method(), uri)
            });

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

        let subscriptions = match &config.subscriptions.seed_file {
            Some(path) => InMemorySubscriptionStore::from_json_file(path)
                .await
                .wrap_err("Failed to load subscription seed file")?,
            None => {
                tracing::warn!("No subscription seed file configured; every trigger will 404");
                InMemorySubscriptionStore::new()
            }
        };

        let delivery_service = DeliveryService::new(
            Arc::new(subscriptions),
            Arc::new(DeliveryLog::new()),
            &config.delivery,
        )
        .wrap_err("Failed to build delivery service")?;

        let shutdown = CancellationToken::new();
        let state = AppState {
            delivery_service: Arc::new(delivery_service),
            shutdown: shutdown.clone(),
        };

        let router = Router::new()
            .route("/", get(home))
            .route("/health", get(health_check))
            .route("/webhook-delivery", post(trigger_delivery))
            .layer(cors_layer)
            .layer(trace_layer)
            .with_state(state);

        let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await
            .wrap_err_with(|| format!("Failed to bind to port {}", config.server.port))?;

        Ok(Self {
            router,
            listener,
            shutdown,
        })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Token that stops the server and cancels in-flight deliveries.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the HTTP server until Ctrl-C or the shutdown token fires.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Server listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(self.shutdown))
            .await?;
        Ok(())
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}
