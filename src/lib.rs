//! Telemetry bridge between an MQTT sensor mesh, a hierarchical store, and
//! an HTTP history API.
//!
//! Two independent activities share one store for the process lifetime:
//! a background subscriber loop that turns inbound sensor messages into
//! durable timestamped readings plus a live snapshot per channel, and an
//! HTTP front end that serves time-bucketed daily aggregates and accepts
//! actuator commands (mirrored back onto the transport).
//!

// Import all sub modules once...
mod command;
mod config;
mod domain;
mod error;
mod history;
mod ingest;

pub mod server;
pub mod store;
pub mod transport;

// Re-export main types
pub use command::CommandPublisher;
pub use history::{aggregate, BucketPoint, DayWindow, HistoryReader, LogEntry};
pub use ingest::{normalize, spawn_subscriber_loop, Recorder};

pub use config::{BridgeConfig, DEFAULT_BUCKET_WIDTH};
pub use error::{Error, Result};

pub use store::create_memory_store;
pub use transport::{create_memory_transport, create_rumqttc_transport, create_transport};

// --- public re-exports
pub use domain::{
    //
    Actuator,
    Channel,
    Message,
    Reading,
    Store,
    StorePtr,
    SubscriptionHandle,
    Topic,
    Transport,
    TransportPtr,
    AI_MODE_PATH,
};
