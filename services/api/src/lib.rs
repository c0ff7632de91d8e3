//! Live Relay API Library Crate
//!
//! This library contains the core logic for the relay service: configuration,
//! application state, tool registration, HTTP handlers, the WebSocket relay,
//! and routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod tools;
pub mod ws;
