//! Adapters implementing the domain ports.
//!
//! - `memory`: snapshot-published in-memory stores
//! - `file`: on-disk stores decorating the in-memory store
//! - `remote`: credential envelope, channel framing and connectors

pub mod file;
pub mod memory;
pub mod remote;
