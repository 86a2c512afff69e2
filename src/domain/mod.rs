// src/domain/mod.rs

//! Domain abstractions shared by the ingestion and request paths.
//!
//! Nothing in here references a concrete broker, store backend, or HTTP
//! framework. Concrete implementations live under `src/transport/` and
//! `src/store/`.

mod channel;
mod reading;
mod store;
mod transport;

pub use channel::{Actuator, Channel, AI_MODE_PATH};
pub use reading::Reading;
pub use store::{Store, StorePtr};
pub use transport::{
    //
    Message,
    SubscriptionHandle,
    Topic,
    Transport,
    TransportPtr,
};
