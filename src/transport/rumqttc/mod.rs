// src/transport/rumqttc/mod.rs

//! MQTT transport backed by `rumqttc`.

mod transport;

pub use transport::create_rumqttc_transport;
