// src/main.rs

//! Bridge process entry point.
//!
//! Wiring only: load config, build the shared transport and store handles,
//! spawn the background subscriber loop, then serve the HTTP API on the
//! foreground task. The subscriber loop and the HTTP front end communicate
//! only through the store.

use growhouse_bridge::{
    // ---
    server,
    spawn_subscriber_loop,
    BridgeConfig,
    CommandPublisher,
    HistoryReader,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ---
    env_logger::init();

    let config = BridgeConfig::from_env();
    log::info!(
        "bridge: starting (broker: {}, namespace: {})",
        config.broker_uri.as_deref().unwrap_or("in-memory"),
        config.namespace
    );

    let transport = growhouse_bridge::create_transport(&config).await?;
    let store = growhouse_bridge::create_memory_store().await?;

    // Background ingestion; the handle is deliberately not awaited, the
    // loop runs until the transport closes at process shutdown.
    let _ingest = spawn_subscriber_loop(transport.clone(), store.clone(), &config).await?;

    let state = server::AppState {
        history: HistoryReader::new(store.clone(), config.bucket_width),
        commands: CommandPublisher::new(store, transport, config.namespace.clone()),
    };

    server::serve(state, &config.http_addr).await?;

    Ok(())
}
