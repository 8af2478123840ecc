//! WebSocket support for live collection snapshots.
//!
//! Clients connect via WebSocket, open subscriptions on filtered collections,
//! and receive a full snapshot whenever the matching documents change.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
