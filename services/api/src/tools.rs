//! Startup registration of the tools this relay answers locally.

use crate::config::Config;
use live_relay_core::{
    ToolRegistry,
    tools::{BaiduMaps, MapsTool, OfflineMaps},
};
use tracing::{info, warn};

/// Builds the registry from configuration. Fails on any invalid declaration.
pub fn build_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    match &config.baidu_maps_api_key {
        Some(key) => {
            info!("Using Baidu Maps for location tools.");
            registry.register_handler(MapsTool::new(BaiduMaps::new(key.clone())?))?;
        }
        None => {
            warn!("BAIDU_MAPS_API_KEY not set; location tools answer from offline data.");
            registry.register_handler(MapsTool::new(OfflineMaps))?;
        }
    }
    info!(tools = ?registry.names(), "Tool registry ready.");
    Ok(registry)
}
