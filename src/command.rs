// src/command.rs

//! The command path: actuator state changes and the AI-mode flag.
//!
//! Thin by design. An actuator command is two best-effort writes: the
//! boolean lands in the store, then the equivalent `ON`/`OFF` event is
//! mirrored onto the actuator's transport topic. There is no two-phase
//! commit; either side can fail independently and the firmware reconciles
//! from the store on its next poll.

use serde_json::json;

use crate::{
    // ---
    Actuator,
    Message,
    Result,
    StorePtr,
    TransportPtr,
};

use crate::domain::AI_MODE_PATH;

/// Publishes actuator commands to the store and the transport.
///
/// Holds the same shared transport handle as the subscriber loop; both are
/// constructor-injected rather than reaching for a global client.
#[derive(Clone)]
pub struct CommandPublisher {
    store: StorePtr,
    transport: TransportPtr,
    namespace: String,
}

impl CommandPublisher {
    pub fn new(store: StorePtr, transport: TransportPtr, namespace: impl Into<String>) -> Self {
        Self {
            store,
            transport,
            namespace: namespace.into(),
        }
    }

    /// Set an actuator's state: store write first, then the transport event.
    ///
    /// Returns the applied state so the HTTP layer can echo it back.
    pub async fn set_state(&self, actuator: Actuator, state: bool) -> Result<bool> {
        // ---
        self.store.set(&actuator.state_path(), json!(state)).await?;

        let payload = if state { "ON" } else { "OFF" };
        self.transport
            .publish(Message::text(actuator.topic(&self.namespace), payload))
            .await?;

        log::info!("command: {} -> {payload}", actuator.key());
        Ok(state)
    }

    /// Set the AI-mode flag.
    ///
    /// Store-only; the controller reads the flag, nothing subscribes to it.
    pub async fn set_ai_mode(&self, state: bool) -> Result<bool> {
        // ---
        self.store.set(AI_MODE_PATH, json!(state)).await?;

        log::info!("command: AI mode -> {state}");
        Ok(state)
    }
}
