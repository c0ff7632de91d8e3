//! WebSocket Session Relay
//!
//! This module contains the logic for relaying Live API sessions between a
//! downstream client and the upstream model. It is structured into submodules:
//!
//! - `frame`: Transport-neutral frames and adapters for both socket types.
//! - `upstream`: Opening the upstream connection with the client's credential.
//! - `lifecycle`: Per-session state (`CONNECTING` through `CLOSED`).
//! - `relay`: The per-session state machine and tool-call interception.
//! - `supervisor`: The table of live sessions.
//! - `session`: The axum upgrade handler.

pub mod frame;
pub mod lifecycle;
pub mod relay;
pub mod session;
pub mod supervisor;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use session::ws_handler;
