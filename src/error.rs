use thiserror::Error;

/// Errors that can occur while bridging sensor traffic.
///
/// The variants split along the propagation policy: request-path errors
/// (`InvalidDate`, `InvalidTarget`, `InvalidChannel`, `NotFound`) are
/// converted into structured JSON payloads at the HTTP boundary, while
/// ingestion-path errors (`Parse`, `Storage`) are logged and the subscriber
/// loop moves on to the next message.
#[derive(Error, Debug)]
pub enum Error {
    /// Sensor payload was neither the `nan` sentinel nor a float literal
    #[error("unparseable sensor payload: {0:?}")]
    Parse(String),

    /// Client-supplied date did not parse as YYYY-MM-DD
    #[error("invalid date format; use YYYY-MM-DD")]
    InvalidDate(String),

    /// Control request named something outside the actuator set
    #[error("invalid control target: {0:?}")]
    InvalidTarget(String),

    /// History request named something outside the sensor set
    #[error("invalid sensor type: {0:?}")]
    InvalidChannel(String),

    /// No readings logged for the requested channel
    #[error("no data found")]
    NotFound,

    /// Store collaborator failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport collaborator failed (publish, subscribe, or connection)
    #[error("transport error")]
    Transport,

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MQTT client error
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;
