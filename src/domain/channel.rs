// src/domain/channel.rs

//! Closed enumerations for the sensor and actuator streams.
//!
//! The installation has a fixed mesh: five sensors feeding readings in and
//! three actuators taking commands out, plus a single AI-mode flag. Keeping
//! these as enums (rather than free-form strings) makes an invalid control
//! target a parse failure at the boundary instead of a silent dead store
//! path.

use crate::{Error, Result, Topic};

/// A sensor stream the bridge ingests and serves history for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Indoor temperature
    Temp,
    /// Indoor relative humidity
    Humidity,
    /// Light intensity
    LightIntensity,
    /// Outdoor temperature
    TempOut,
    /// Outdoor humidity
    HumOut,
}

impl Channel {
    /// All sensor channels, in subscription order.
    pub const ALL: [Channel; 5] = [
        Channel::Temp,
        Channel::Humidity,
        Channel::LightIntensity,
        Channel::TempOut,
        Channel::HumOut,
    ];

    /// The wire/store key for this channel (final topic segment and log
    /// subtree name).
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Temp => "temp",
            Channel::Humidity => "humidity",
            Channel::LightIntensity => "lightIntensity",
            Channel::TempOut => "tempout",
            Channel::HumOut => "humout",
        }
    }

    /// Resolve a channel from its wire key.
    pub fn from_key(key: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.key() == key)
            .ok_or_else(|| Error::InvalidChannel(key.to_string()))
    }

    /// Resolve a channel from the final segment of an inbound topic.
    pub fn from_topic(topic: &Topic) -> Result<Self> {
        Self::from_key(topic.last_segment())
    }

    /// The MQTT topic this channel's readings arrive on.
    pub fn topic(&self, namespace: &str) -> Topic {
        Topic::from(format!("{namespace}/{}", self.key()))
    }

    /// Store path of this channel's append-only reading log.
    pub fn log_path(&self) -> String {
        self.key().to_string()
    }

    /// Store path of this channel's live (latest value) slot.
    pub fn live_path(&self) -> String {
        format!("live/{}", self.key())
    }
}

/// An actuator the bridge accepts commands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Actuator {
    Fan,
    Mister,
    Light,
}

impl Actuator {
    /// The store/control key for this actuator.
    pub fn key(&self) -> &'static str {
        match self {
            Actuator::Fan => "fanStatus",
            Actuator::Mister => "misterStatus",
            Actuator::Light => "lightStatus",
        }
    }

    /// Resolve an actuator from its control key.
    ///
    /// Anything outside the fixed set is an [`Error::InvalidTarget`].
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "fanStatus" => Ok(Actuator::Fan),
            "misterStatus" => Ok(Actuator::Mister),
            "lightStatus" => Ok(Actuator::Light),
            other => Err(Error::InvalidTarget(other.to_string())),
        }
    }

    /// The MQTT topic state changes are mirrored onto.
    pub fn topic(&self, namespace: &str) -> Topic {
        Topic::from(format!("{namespace}/{}", self.key()))
    }

    /// Store path of this actuator's state flag.
    pub fn state_path(&self) -> String {
        self.key().to_string()
    }
}

/// Store path of the AI-mode flag.
pub const AI_MODE_PATH: &str = "AI_mode";

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn channel_keys_round_trip() {
        // ---
        for channel in Channel::ALL {
            assert_eq!(Channel::from_key(channel.key()).unwrap(), channel);
        }
    }

    #[test]
    fn channel_from_topic_takes_last_segment() {
        // ---
        let topic = Topic::from("growhouse/lightIntensity");
        assert_eq!(Channel::from_topic(&topic).unwrap(), Channel::LightIntensity);
    }

    #[test]
    fn unknown_channel_key_rejected() {
        // ---
        assert!(matches!(
            Channel::from_key("co2"),
            Err(Error::InvalidChannel(_))
        ));
    }

    #[test]
    fn live_path_is_namespaced() {
        // ---
        assert_eq!(Channel::Temp.live_path(), "live/temp");
        assert_eq!(Channel::Temp.log_path(), "temp");
    }

    #[test]
    fn actuator_keys_round_trip() {
        // ---
        for actuator in [Actuator::Fan, Actuator::Mister, Actuator::Light] {
            assert_eq!(Actuator::from_key(actuator.key()).unwrap(), actuator);
        }
    }

    #[test]
    fn unknown_actuator_rejected() {
        // ---
        assert!(matches!(
            Actuator::from_key("pumpStatus"),
            Err(Error::InvalidTarget(_))
        ));
    }
}
