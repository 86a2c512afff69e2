// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the pub/sub interface the bridge consumes. It
//! intentionally avoids any reference to concrete protocols, brokers, or
//! client libraries: the transport is responsible only for delivering opaque
//! payload bytes to subscribed consumers and publishing them on request.
//!
//! Higher-level semantics — payload normalization, persistence, actuator
//! command shaping — are handled elsewhere.
//!
//! Concrete implementations of this interface live under `src/transport/`.

use crate::Result;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// A transport topic.
///
/// A `Topic` names a single pub/sub channel (e.g. `growhouse/temp`). It is
/// treated as an opaque identifier at the domain level: no wildcard or
/// hierarchy semantics are assumed, and subscriptions match topics by exact
/// string equality.
///
/// Topics are immutable, cheap to clone, and safe to share across threads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic(pub Arc<str>);

impl Topic {
    /// The final path segment of the topic, used to resolve the channel a
    /// sensor reading belongs to.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl<T> From<T> for Topic
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Topic(value.into())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivered or outbound transport message.
///
/// The payload is opaque to the transport layer; for this system it is
/// UTF-8 text (a decimal float, the `nan` sentinel, or `ON`/`OFF`), but the
/// transport neither inspects nor validates it.
#[derive(Clone, Debug)]
pub struct Message {
    // ---
    /// Topic the message was delivered on or should be published to.
    pub topic: Topic,

    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Message {
    /// Build a message from a topic and a textual payload.
    pub fn text(topic: impl Into<Topic>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: Bytes::from(payload.into()),
        }
    }
}

/// Handle returned from a successful subscription.
///
/// The subscription remains active until either the handle is dropped
/// (receiver channel closes) or the transport is closed. When subscribed to
/// several topics at once, all of them feed the same inbox, preserving
/// per-connection delivery order.
pub struct SubscriptionHandle {
    // ---
    /// Receiver channel for delivered messages matching this subscription.
    pub inbox: mpsc::Receiver<Message>,
}

/// Transport abstraction.
///
/// A `Transport` provides best-effort delivery of messages between
/// publishers and subscribers. It defines the minimal contract the
/// ingestion and command paths need without committing to a specific
/// protocol or broker.
///
/// Implementations must ensure that:
/// - Once `subscribe_many()` returns successfully, messages published
///   *after* that point on any of the listed topics are deliverable.
/// - `publish()` is non-blocking with respect to subscribers.
/// - No assumptions are made about ordering across topics, durability, or
///   retries beyond what is explicitly documented.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---

    /// Publish a message to its topic.
    ///
    /// Delivery is best-effort and non-durable; actuator state lives in the
    /// store, so a lost `ON`/`OFF` event is recoverable out of band.
    async fn publish(&self, msg: Message) -> Result<()>;

    /// Register a subscription over one or more topics and return a handle
    /// whose single inbox receives messages for all of them.
    ///
    /// A shared inbox keeps the subscriber loop strictly sequential: one
    /// message is processed to completion before the next is taken.
    async fn subscribe_many(&self, topics: &[Topic]) -> Result<SubscriptionHandle>;

    /// Close the transport and release any associated resources.
    async fn close(&self) -> Result<()>;
}

/// Shared transport pointer.
///
/// An `Arc<dyn Transport>`: `.clone()` is cheap, all clones share the same
/// underlying connection, and concrete transport types stay erased behind a
/// stable domain interface. The same handle is injected into both the
/// subscriber loop and the command publisher.
pub type TransportPtr = Arc<dyn Transport>;
