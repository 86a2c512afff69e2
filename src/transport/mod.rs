// src/transport/mod.rs

//! Concrete transport implementations.
//!
//! - `memory` — in-process reference implementation, always available.
//! - `rumqttc` — MQTT broker connection used in production.
//!
//! `create_transport()` selects between them based on whether the config
//! names a broker.

mod memory;
mod rumqttc;

pub use memory::create_memory_transport;
pub use rumqttc::create_rumqttc_transport;

use crate::{BridgeConfig, Result, TransportPtr};

/// Create the transport selected by the configuration.
///
/// A configured broker URI selects MQTT; otherwise the in-memory transport
/// is used (tests, local development without a broker).
pub async fn create_transport(config: &BridgeConfig) -> Result<TransportPtr> {
    // ---
    match &config.broker_uri {
        Some(_) => create_rumqttc_transport(config).await,
        None => create_memory_transport().await,
    }
}
