// src/ingest.rs

//! The ingestion path: payload normalization, reading persistence, and the
//! background subscriber loop.
//!
//! The loop is spawned once at process startup and runs for the process
//! lifetime. It shares nothing with the request path except the store.
//!
//! ## Error handling
//!
//! A malformed payload or a store failure costs at most the one message it
//! arrived in: the error is logged and the loop takes the next message.
//! Message loss is an accepted failure mode here; process death is not.
//! The loop itself only exits when the transport closes.
//!
//! ## Ordering
//!
//! One inbound message is processed to completion before the next is taken.
//! There is no internal queue or parallelism; if processing falls behind,
//! messages back up inside the transport collaborator.

use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    // ---
    BridgeConfig,
    Channel,
    Error,
    Message,
    Reading,
    Result,
    StorePtr,
    TransportPtr,
};

/// Sentinel token sensors publish when they have no numeric reading.
const NAN_SENTINEL: &str = "nan";

/// Parse a raw sensor payload into a value.
///
/// The literal token `nan` (case-sensitive) maps to `0.0`; everything else
/// must be a float literal. Note the sentinel check comes first: `f64`'s own
/// parser would happily accept `"nan"` as an IEEE NaN, which must never
/// reach the store.
pub fn normalize(payload: &[u8]) -> Result<f64> {
    // ---
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::Parse(String::from_utf8_lossy(payload).into_owned()))?;

    if text == NAN_SENTINEL {
        return Ok(0.0);
    }

    text.parse::<f64>()
        .map_err(|_| Error::Parse(text.to_string()))
}

/// Snapshot & log writer.
///
/// Owns nothing but a store handle; both the subscriber loop and tests
/// drive it directly.
#[derive(Clone)]
pub struct Recorder {
    store: StorePtr,
}

impl Recorder {
    pub fn new(store: StorePtr) -> Self {
        Self { store }
    }

    /// Append a reading to the channel's log, then overwrite the channel's
    /// live slot.
    ///
    /// The two writes are independent; there is no multi-key atomicity. A
    /// reader may observe the log entry before the live value (or a store
    /// failure may leave only the first write applied). Store errors
    /// propagate; retry policy belongs to the store collaborator.
    pub async fn record(&self, channel: Channel, value: f64, observed_at: f64) -> Result<()> {
        // ---
        let reading = Reading::new(value, observed_at);

        self.store
            .push(&channel.log_path(), serde_json::to_value(reading)?)
            .await?;

        self.store.set(&channel.live_path(), json!(value)).await?;

        Ok(())
    }
}

/// Current epoch time in seconds, with sub-second resolution.
fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Spawn the subscriber loop as a background task.
///
/// Subscribes to every sensor channel under the configured namespace and
/// records each delivered reading. The returned handle represents the
/// lifetime of the loop; it completes only when the transport closes.
pub async fn spawn_subscriber_loop(
    transport: TransportPtr,
    store: StorePtr,
    config: &BridgeConfig,
) -> Result<JoinHandle<()>> {
    // ---
    let topics: Vec<_> = Channel::ALL
        .iter()
        .map(|c| c.topic(&config.namespace))
        .collect();

    let mut handle = transport.subscribe_many(&topics).await?;
    let recorder = Recorder::new(store);

    let join = tokio::spawn(async move {
        // ---
        while let Some(msg) = handle.inbox.recv().await {
            if let Err(err) = ingest_one(&recorder, &msg).await {
                log::warn!("ingest: dropped message on {}: {err}", msg.topic);
            }
        }
        log::debug!("ingest: transport closed, subscriber loop exiting");
    });

    Ok(join)
}

/// Process one inbound sensor message.
async fn ingest_one(recorder: &Recorder, msg: &Message) -> Result<()> {
    // ---
    let channel = Channel::from_topic(&msg.topic)?;
    let value = normalize(&msg.payload)?;

    recorder.record(channel, value, now_epoch()).await
}
