// src/transport/memory.rs

//! In-memory transport implementation.
//!
//! This transport simulates a message broker entirely within the process
//! and is the **reference implementation** of transport semantics. The MQTT
//! transport is expected to approximate this behavior as closely as its
//! underlying client allows and to document any unavoidable deviations.
//!
//! ## Semantics
//!
//! - Subscriptions are registered immediately.
//! - Once `subscribe_many()` returns, subsequent matching publishes are
//!   deliverable.
//! - A topic matches a subscription only on exact string equality.
//! - Message delivery is deterministic within a single process.
//! - Dropping a `SubscriptionHandle` implicitly unregisters the subscription.
//!
//! ## Non-Goals
//!
//! - Persistence or durability
//! - Network behavior or failure simulation
//! - Exact emulation of MQTT broker semantics

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::{
    // ---
    Message,
    Result,
    SubscriptionHandle,
    Topic,
    Transport,
    TransportPtr,
};

struct MemoryTransport {
    // ---
    subscribers: RwLock<HashMap<Topic, Vec<mpsc::Sender<Message>>>>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---

    /// Deliver a message to every subscriber registered for its topic.
    async fn publish(&self, msg: Message) -> Result<()> {
        // ---
        let subs = self.subscribers.read().await;

        if let Some(senders) = subs.get(&msg.topic) {
            for sender in senders {
                // Ignore send failures; a closed channel indicates a
                // dropped SubscriptionHandle.
                let _ = sender.send(msg.clone()).await;
            }
        }

        Ok(())
    }

    /// Register one inbox under every listed topic.
    ///
    /// All topics share the sender, so the returned handle receives their
    /// messages interleaved in publish order.
    async fn subscribe_many(&self, topics: &[Topic]) -> Result<SubscriptionHandle> {
        // ---
        let (tx, rx) = mpsc::channel(16);

        let mut subs = self.subscribers.write().await;
        for topic in topics {
            subs.entry(topic.clone()).or_default().push(tx.clone());
        }

        Ok(SubscriptionHandle { inbox: rx })
    }

    /// Close the transport. For the in-memory transport this clears all
    /// subscriptions.
    async fn close(&self) -> Result<()> {
        // ---
        let mut subs = self.subscribers.write().await;
        subs.clear();
        Ok(())
    }
}

/// Create a new in-memory transport.
///
/// Always available and requires no external resources.
pub async fn create_memory_transport() -> Result<TransportPtr> {
    // ---
    let transport = MemoryTransport {
        subscribers: RwLock::new(HashMap::new()),
    };

    Ok(Arc::new(transport))
}
