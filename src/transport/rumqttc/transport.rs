// src/transport/rumqttc/transport.rs

//! MQTT transport implementation using `rumqttc`.
//!
//! This module implements the `Transport` trait over an MQTT broker
//! connection. It follows an **actor-based concurrency model** to safely
//! integrate with the underlying MQTT client.
//!
//! ## Concurrency model
//!
//! - A single background **actor task** owns the MQTT `EventLoop`.
//! - The actor is responsible for:
//!   - publishing outbound messages via `AsyncClient`,
//!   - registering broker subscriptions,
//!   - polling the `EventLoop` for incoming publishes,
//!   - clean shutdown of the connection.
//! - All interaction with the MQTT client is serialized through this actor;
//!   no other task ever touches the event loop directly.
//!
//! ## Connection behavior
//!
//! Connection to the broker is **lazy** - it happens when the EventLoop
//! first polls after transport creation. ConnAck success/failure is logged
//! at info/error level. On disconnect the actor waits briefly, lets the
//! EventLoop reconnect, and re-subscribes every known topic.
//!
//! ## Message delivery semantics
//!
//! Incoming publishes are **demultiplexed by topic** and **fanned out** to
//! all local subscribers registered for that topic, matching the memory
//! transport contract. Payload bytes pass through untouched; the sensors
//! publish bare text, not a structured envelope. Delivery is best-effort
//! and non-durable: a subscriber whose inbox is full loses that one message
//! (it stays registered); only a dropped subscriber is evicted.

use rumqttc::{
    //
    AsyncClient,
    ConnectReturnCode,
    Event,
    EventLoop,
    MqttOptions,
    Packet,
    Publish,
    QoS,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::{
    // ---
    BridgeConfig,
    Error,
    Message,
    Result,
    SubscriptionHandle,
    Topic,
    Transport,
    TransportPtr,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

type SubscriberMap = Arc<RwLock<HashMap<String, Vec<mpsc::Sender<Message>>>>>;

//
// Actor commands
//

enum Cmd {
    //
    Publish {
        msg: Message,
        resp: oneshot::Sender<Result<()>>,
    },
    Subscribe {
        topics: Vec<String>,
        resp: oneshot::Sender<Result<()>>,
    },
    Close {
        resp: oneshot::Sender<Result<()>>,
    },
}

enum ActorStep {
    //
    Continue,
    Stop,
}

impl Cmd {
    // ---

    /// Dispatches an actor command to the correct handler on the actor.
    async fn handle(self, actor: &mut MqttActor) -> ActorStep {
        // ---
        match self {
            Cmd::Publish { msg, resp } => {
                let result = actor.handle_publish(msg).await;
                let _ = resp.send(result);
                ActorStep::Continue
            }
            Cmd::Subscribe { topics, resp } => {
                let result = actor.handle_subscribe(topics).await;
                let _ = resp.send(result);
                ActorStep::Continue
            }
            Cmd::Close { resp } => {
                actor.handle_close().await;
                let _ = resp.send(Ok(()));
                ActorStep::Stop
            }
        }
    }
}

/// MQTT-based implementation of the `Transport` trait.
///
/// Represents a single broker connection and provides best-effort,
/// non-durable message delivery consistent with memory transport semantics.
pub struct RumqttcTransport {
    // ---
    cmd_tx: mpsc::Sender<Cmd>,
    subscribers: SubscriberMap,
}

impl RumqttcTransport {
    // ---

    /// Creates a new rumqttc transport with the given client and event loop.
    ///
    /// This function is infallible - the actual broker connection happens
    /// lazily when the EventLoop starts polling in the background actor.
    pub fn create(
        client_id: impl Into<String>,
        client: AsyncClient,
        event_loop: EventLoop,
    ) -> TransportPtr {
        // ---
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let subscribers: SubscriberMap = Arc::new(RwLock::new(HashMap::new()));

        let actor = MqttActor {
            client_id: client_id.into(),
            client,
            event_loop,
            cmd_rx,
            subscribers: Arc::clone(&subscribers),
            reconnect: false,
        };

        tokio::spawn(actor.run());

        Arc::new(Self {
            cmd_tx,
            subscribers,
        })
    }
}

struct MqttActor {
    // ---
    client_id: String, // for logging only
    client: AsyncClient,
    event_loop: EventLoop,
    cmd_rx: mpsc::Receiver<Cmd>,
    subscribers: SubscriberMap,
    reconnect: bool,
}

impl MqttActor {
    // ---

    async fn run(mut self) {
        // ---
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if matches!(cmd.handle(&mut self).await, ActorStep::Stop) {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                event = self.event_loop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let subscribers = Arc::clone(&self.subscribers);
                            Self::handle_incoming(subscribers, publish).await;
                        }
                        Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                            self.handle_connack(connack); // not async

                            if self.reconnect {
                                self.resubscribe_all().await;
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(_suback))) => {
                            log::debug!("{}: subscription acknowledged", self.client_id);
                        }
                        Ok(_event) => {
                            // Other events (PingResp, PubAck, etc.) - ignore
                            log::trace!("{}: mqtt event (ignored): {:?}", self.client_id, _event);
                        }
                        Err(err) => {
                            if is_disconnect(&err) {
                                self.reconnect = true;
                                log::error!("{}: broker disconnected: {err}", self.client_id);
                            } else {
                                log::error!("{}: mqtt error: {err}", self.client_id);
                            }
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue;
                        }
                    }
                }
            }
        }
    }

    /// Publishes a message to the broker with QoS 0 (at most once).
    ///
    /// Payload bytes pass through untouched.
    async fn handle_publish(&mut self, msg: Message) -> Result<()> {
        // ---
        let topic = msg.topic.0.as_ref();

        self.client
            .publish(topic, QoS::AtMostOnce, false, msg.payload.to_vec())
            .await
            .map_err(|err| {
                log::error!("{}: publish failed for topic {topic}: {err}", self.client_id);
                Error::from(err)
            })
    }

    /// Registers broker subscriptions for the given topics.
    ///
    /// Returns once the subscribe requests are handed to the client; SUBACK
    /// confirmations are logged as they arrive. Inbound fanout channels are
    /// already registered by the caller, so no message published after this
    /// returns is droppable on the local side.
    async fn handle_subscribe(&mut self, topics: Vec<String>) -> Result<()> {
        // ---
        for topic in topics {
            self.client
                .subscribe(&topic, QoS::AtMostOnce)
                .await
                .map_err(|err| {
                    log::error!(
                        "{}: subscribe failed for topic {topic}: {err}",
                        self.client_id
                    );
                    Error::from(err)
                })?;
            log::info!("{}: subscribed to {topic}", self.client_id);
        }
        Ok(())
    }

    /// Re-registers every known topic after a broker reconnect.
    async fn resubscribe_all(&mut self) {
        // ---
        let topics: Vec<String> = {
            let map = self.subscribers.read().await;
            map.keys().cloned().collect()
        };

        for topic in topics {
            if let Err(err) = self.client.subscribe(&topic, QoS::AtMostOnce).await {
                log::error!("{}: resubscribe failed for {topic}: {err}", self.client_id);
            } else {
                log::info!("{}: resubscribed to {topic}", self.client_id);
            }
        }
    }

    /// Processes connection acknowledgment from the broker.
    fn handle_connack(&self, connack: rumqttc::ConnAck) {
        // ---
        if connack.code == ConnectReturnCode::Success {
            log::info!("{}: connected to broker", self.client_id);
        } else {
            log::error!("{}: connection refused: {:?}", self.client_id, connack.code);
        }
    }

    /// Disconnects from the MQTT broker.
    async fn handle_close(&mut self) {
        // ---
        log::debug!("{}: disconnecting mqtt client", self.client_id);

        if let Err(err) = self.client.disconnect().await {
            log::debug!("{}: mqtt disconnect failed: {err}", self.client_id);
        }
    }

    /// Fans an incoming broker publish out to local subscribers.
    ///
    /// Dropped subscribers are evicted during delivery.
    async fn handle_incoming(subscribers: SubscriberMap, publish: Publish) {
        // ---
        let topic = publish.topic.clone();

        let senders = {
            let map = subscribers.read().await;
            map.get(&topic).cloned()
        };

        let Some(senders) = senders else {
            // No subscribers for this topic
            return;
        };

        let msg = Message {
            topic: Topic::from(topic.clone()),
            payload: Bytes::from(publish.payload.to_vec()),
        };

        // Snapshot the original subscriber count before consuming `senders`.
        let original_len = senders.len();

        let survivors = deliver(senders, &msg);

        // Only update the map if something changed.
        if survivors.len() != original_len {
            let mut map = subscribers.write().await;
            map.insert(topic, survivors);
        }
    }
} // MqttActor

/// Deliver one message to each registered sender, returning the senders
/// that stay registered.
///
/// A full inbox means the subscriber is alive but behind (e.g. the ingest
/// loop awaiting a store write during a publish burst): only this message
/// is dropped, at-most-once, and the sender is kept. Eviction is reserved
/// for a closed channel, which means the `SubscriptionHandle` was dropped.
fn deliver(senders: Vec<mpsc::Sender<Message>>, msg: &Message) -> Vec<mpsc::Sender<Message>> {
    // ---
    let mut survivors = Vec::with_capacity(senders.len());

    for tx in senders {
        match tx.try_send(msg.clone()) {
            Ok(()) => {
                survivors.push(tx);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Subscriber is behind; lose the message, keep the sender.
                log::warn!("mqtt: subscriber inbox full, dropping message on {}", msg.topic);
                survivors.push(tx);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Receiver was dropped; evict.
            }
        }
    }

    survivors
}

fn is_disconnect(err: &rumqttc::ConnectionError) -> bool {
    // ---
    matches!(
        err,
        rumqttc::ConnectionError::Io(_) | rumqttc::ConnectionError::MqttState(_)
    )
}

#[async_trait::async_trait]
impl Transport for RumqttcTransport {
    // ---

    async fn publish(&self, msg: Message) -> Result<()> {
        // ---
        let (tx, rx) = oneshot::channel();

        self.cmd_tx
            .send(Cmd::Publish { msg, resp: tx })
            .await
            .map_err(|_| Error::Transport)?;

        rx.await.map_err(|_| Error::Transport)?
    }

    async fn subscribe_many(&self, topics: &[Topic]) -> Result<SubscriptionHandle> {
        // ---
        let (tx, rx) = mpsc::channel(64);

        // Register the shared inbox under every topic before asking the
        // broker, so nothing delivered after SUBACK can miss the fanout map.
        {
            let mut map = self.subscribers.write().await;
            for topic in topics {
                map.entry(topic.0.as_ref().to_string())
                    .or_default()
                    .push(tx.clone());
            }
        }

        let (resp_tx, resp_rx) = oneshot::channel();

        self.cmd_tx
            .send(Cmd::Subscribe {
                topics: topics.iter().map(|t| t.0.as_ref().to_string()).collect(),
                resp: resp_tx,
            })
            .await
            .map_err(|_| Error::Transport)?;

        resp_rx.await.map_err(|_| Error::Transport)??;

        Ok(SubscriptionHandle { inbox: rx })
    }

    async fn close(&self) -> Result<()> {
        // ---
        let (tx, rx) = oneshot::channel();

        let _ = self.cmd_tx.send(Cmd::Close { resp: tx }).await;
        let _ = rx.await;

        Ok(())
    }
}

/// Creates a rumqttc-based MQTT transport from the given configuration.
///
/// # Errors
///
/// Returns an error if the config names no broker or the broker URL cannot
/// be parsed.
///
/// # Connection Behavior
///
/// The actual connection to the broker happens lazily when the EventLoop
/// starts polling in the background actor task.
pub async fn create_rumqttc_transport(config: &BridgeConfig) -> Result<TransportPtr> {
    // ---
    let (client, event_loop) = create_mqtt_client(config)?;
    Ok(RumqttcTransport::create(config.client_id.clone(), client, event_loop))
}

/// Creates an MQTT client and event loop from the given configuration.
///
/// Fallible only due to URL parsing; `AsyncClient::new()` itself is
/// infallible and connects lazily on first poll.
fn create_mqtt_client(config: &BridgeConfig) -> Result<(AsyncClient, EventLoop)> {
    // ---
    let broker_uri = config.broker_uri.as_deref().ok_or_else(|| {
        log::error!("rumqttc: no broker URI configured");
        Error::Transport
    })?;

    // Parse broker address (e.g. "mqtt://host:1883", "mqtts://host:8883")
    let tls = broker_uri.starts_with("mqtts://") || broker_uri.starts_with("ssl://");
    let url = broker_uri
        .strip_prefix("mqtts://")
        .or_else(|| broker_uri.strip_prefix("ssl://"))
        .or_else(|| broker_uri.strip_prefix("mqtt://"))
        .or_else(|| broker_uri.strip_prefix("tcp://"))
        .unwrap_or(broker_uri);

    let default_port = if tls { 8883 } else { 1883 };
    let (host, port) = match url.split_once(':') {
        Some((h, p)) => (
            h,
            p.parse().map_err(|err| {
                log::error!("rumqttc: invalid port in broker URL {broker_uri}: {err}");
                Error::Transport
            })?,
        ),
        None => (url, default_port),
    };

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);

    if tls {
        mqtt_options.set_transport(rumqttc::Transport::tls_with_default_config());
    }

    if let (Some(user), Some(password)) = (&config.broker_user, &config.broker_password) {
        mqtt_options.set_credentials(user, password);
    }

    if let Some(keep_alive_secs) = config.keep_alive_secs {
        mqtt_options.set_keep_alive(Duration::from_secs(keep_alive_secs as u64));
    }

    let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

    Ok((client, event_loop))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn sample_msg() -> Message {
        Message::text("growhouse/temp", "23.5")
    }

    #[tokio::test]
    async fn full_inbox_drops_message_but_keeps_subscriber() {
        // ---
        // Arrange: a single-slot inbox, already full.
        // ---
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(sample_msg()).unwrap();

        // ---
        // Act: fan out into the full inbox.
        // ---
        let survivors = deliver(vec![tx], &sample_msg());

        // ---
        // Assert: the message is lost but the subscriber stays registered,
        // and delivery resumes once the backlog drains.
        // ---
        assert_eq!(survivors.len(), 1);

        rx.recv().await.expect("backlog message");
        assert!(rx.try_recv().is_err(), "overflow message must be dropped");

        let survivors = deliver(survivors, &sample_msg());
        assert_eq!(survivors.len(), 1);
        assert!(rx.try_recv().is_ok(), "delivery must resume after drain");
    }

    #[tokio::test]
    async fn dropped_handle_is_evicted() {
        // ---
        let (tx, rx) = mpsc::channel::<Message>(1);
        drop(rx);

        let survivors = deliver(vec![tx], &sample_msg());

        assert!(survivors.is_empty());
    }

    #[tokio::test]
    async fn client_errors_convert_to_the_mqtt_variant() {
        // ---
        // Dropping the event loop closes the client's request channel, so
        // the next publish fails without touching the network.
        let (client, event_loop) = AsyncClient::new(MqttOptions::new("t", "localhost", 1883), 1);
        drop(event_loop);

        let err = client
            .publish("growhouse/temp", QoS::AtMostOnce, false, "1")
            .await
            .expect_err("publish must fail with the event loop gone");

        assert!(matches!(Error::from(err), Error::Mqtt(_)));
    }
}
