//! Service entry point: load configuration, wire the pipeline, serve HTTP.

use papermind::{api, config, logging, processing};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Port range scanned when no explicit port is configured.
const PORT_RANGE: std::ops::RangeInclusive<u16> = 3000..=3099;

#[tokio::main]
async fn main() {
    logging::init_tracing();
    config::init_config();

    let service = Arc::new(processing::ProcessingService::new());
    let router = api::create_router(service);

    let listener = bind_listener().await;
    let address = listener
        .local_addr()
        .expect("Failed to read bound listener address");
    tracing::info!(%address, "papermind listening");

    axum::serve(listener, router)
        .await
        .expect("HTTP server terminated unexpectedly");
}

/// Bind the configured port, or scan the default range for a free one.
async fn bind_listener() -> TcpListener {
    if let Some(port) = config::get_config().server_port {
        return TcpListener::bind(("0.0.0.0", port))
            .await
            .unwrap_or_else(|error| panic!("Failed to bind port {port}: {error}"));
    }

    for port in PORT_RANGE {
        if let Ok(listener) = TcpListener::bind(("0.0.0.0", port)).await {
            return listener;
        }
        tracing::debug!(port, "Port unavailable, trying next");
    }
    panic!(
        "No free port in {}..={}",
        PORT_RANGE.start(),
        PORT_RANGE.end()
    );
}
