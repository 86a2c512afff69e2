// src/store/mod.rs

//! Concrete store implementations.
//!
//! Only the in-memory reference implementation lives in this crate; a
//! production deployment points the same `Store` trait at whatever durable
//! tree the site runs.

mod memory;

pub use memory::create_memory_store;
