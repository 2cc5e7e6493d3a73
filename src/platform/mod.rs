//! Adapters between chat client libraries and the relay.

pub mod discord;
