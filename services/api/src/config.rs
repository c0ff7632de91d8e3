use gemini_realtime::client::LIVE_API_URL;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Live API endpoint; the caller's key is appended per session.
    pub upstream_url: String,
    /// Upper bound on answering one tool-call batch.
    pub tool_timeout: Duration,
    pub upstream_connect_timeout: Duration,
    /// Add the registry's declarations to a `setup` that carries none.
    pub inject_tool_declarations: bool,
    pub baidu_maps_api_key: Option<String>,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            upstream_url: LIVE_API_URL.to_string(),
            tool_timeout: Duration::from_secs(10),
            upstream_connect_timeout: Duration::from_secs(15),
            inject_tool_declarations: false,
            baidu_maps_api_key: None,
            log_level: Level::INFO,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(s) => s
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?,
            Err(_) => defaults.bind_address,
        };

        let upstream_url = std::env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url);
        if !(upstream_url.starts_with("ws://") || upstream_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue(
                "UPSTREAM_URL".to_string(),
                format!("'{}' is not a ws:// or wss:// URL", upstream_url),
            ));
        }

        let tool_timeout = secs_var("TOOL_TIMEOUT_SECS")?.unwrap_or(defaults.tool_timeout);
        let upstream_connect_timeout =
            secs_var("UPSTREAM_CONNECT_TIMEOUT_SECS")?.unwrap_or(defaults.upstream_connect_timeout);

        let inject_tool_declarations = match std::env::var("INJECT_TOOL_DECLARATIONS") {
            Ok(s) => parse_bool(&s).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "INJECT_TOOL_DECLARATIONS".to_string(),
                    format!("'{}' is not a boolean", s),
                )
            })?,
            Err(_) => defaults.inject_tool_declarations,
        };

        let baidu_maps_api_key = std::env::var("BAIDU_MAPS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            upstream_url,
            tool_timeout,
            upstream_connect_timeout,
            inject_tool_declarations,
            baidu_maps_api_key,
            log_level,
        })
    }
}

fn secs_var(name: &str) -> Result<Option<Duration>, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("UPSTREAM_URL");
            env::remove_var("TOOL_TIMEOUT_SECS");
            env::remove_var("UPSTREAM_CONNECT_TIMEOUT_SECS");
            env::remove_var("INJECT_TOOL_DECLARATIONS");
            env::remove_var("BAIDU_MAPS_API_KEY");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.upstream_url, LIVE_API_URL);
        assert_eq!(config.tool_timeout, Duration::from_secs(10));
        assert_eq!(config.upstream_connect_timeout, Duration::from_secs(15));
        assert!(!config.inject_tool_declarations);
        assert_eq!(config.baidu_maps_api_key, None);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("UPSTREAM_URL", "ws://127.0.0.1:9000/live");
            env::set_var("TOOL_TIMEOUT_SECS", "3");
            env::set_var("UPSTREAM_CONNECT_TIMEOUT_SECS", "5");
            env::set_var("INJECT_TOOL_DECLARATIONS", "true");
            env::set_var("BAIDU_MAPS_API_KEY", "baidu-key");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.upstream_url, "ws://127.0.0.1:9000/live");
        assert_eq!(config.tool_timeout, Duration::from_secs(3));
        assert_eq!(config.upstream_connect_timeout, Duration::from_secs(5));
        assert!(config.inject_tool_declarations);
        assert_eq!(config.baidu_maps_api_key, Some("baidu-key".to_string()));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_blank_maps_key_is_ignored() {
        clear_env_vars();
        unsafe {
            env::set_var("BAIDU_MAPS_API_KEY", "   ");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.baidu_maps_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_config_invalid_upstream_url() {
        clear_env_vars();
        unsafe {
            env::set_var("UPSTREAM_URL", "https://generativelanguage.googleapis.com");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "UPSTREAM_URL");
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeouts() {
        for bad in ["0", "-1", "ten"] {
            clear_env_vars();
            unsafe {
                env::set_var("TOOL_TIMEOUT_SECS", bad);
            }

            let err = Config::from_env().unwrap_err();
            let ConfigError::InvalidValue(var, _) = err;
            assert_eq!(var, "TOOL_TIMEOUT_SECS");
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bool() {
        clear_env_vars();
        unsafe {
            env::set_var("INJECT_TOOL_DECLARATIONS", "maybe");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "INJECT_TOOL_DECLARATIONS");
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "RUST_LOG");
    }
}
