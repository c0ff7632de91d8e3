//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! read-only resources every session uses.

use crate::{
    config::Config,
    ws::{relay::RelaySettings, supervisor::SessionSupervisor, upstream::UpstreamConnector},
};
use live_relay_core::{ToolDispatcher, ToolRegistry};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Read-only after startup.
    pub registry: Arc<ToolRegistry>,
    pub dispatcher: ToolDispatcher,
    pub connector: Arc<dyn UpstreamConnector>,
    pub supervisor: SessionSupervisor,
}

impl AppState {
    pub fn new(config: Config, registry: ToolRegistry, connector: Arc<dyn UpstreamConnector>) -> Self {
        let registry = Arc::new(registry);
        Self {
            config: Arc::new(config),
            dispatcher: ToolDispatcher::new(registry.clone()),
            registry,
            connector,
            supervisor: SessionSupervisor::new(),
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            tool_timeout: self.config.tool_timeout,
            connect_timeout: self.config.upstream_connect_timeout,
            inject: self
                .config
                .inject_tool_declarations
                .then(|| self.registry.declarations()),
        }
    }
}
