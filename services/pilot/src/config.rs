use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use vts_client::{
    ClientConfig, LatencyConfig, PluginIdentity,
    config::{default_expressions, default_motions},
};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub plugin: PluginIdentity,
    pub vtuber_name: String,
    pub latency: LatencyConfig,
    pub request_timeout: Duration,
    pub expressions: HashMap<String, String>,
    pub motions: HashMap<String, String>,
    pub token_path: PathBuf,
    pub resources_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let host = std::env::var("VTS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("VTS_PORT", 8001u16)?;

        let defaults = PluginIdentity::default();
        let plugin = PluginIdentity {
            name: std::env::var("VTS_PLUGIN_NAME").unwrap_or(defaults.name),
            developer: std::env::var("VTS_PLUGIN_DEVELOPER").unwrap_or(defaults.developer),
            icon: std::env::var("VTS_PLUGIN_ICON").ok().filter(|s| !s.is_empty()),
        };
        let vtuber_name = std::env::var("VTUBER_NAME").unwrap_or_else(|_| "Hiyori_A".to_string());

        let window_capacity = parse_var("VTS_LATENCY_WINDOW", 100usize)?;
        if window_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "VTS_LATENCY_WINDOW".to_string(),
                "window must hold at least one sample".to_string(),
            ));
        }
        let latency = LatencyConfig {
            window_capacity,
            threshold: seconds_var("VTS_LATENCY_THRESHOLD", 2.0)?,
            watchdog_interval: seconds_var("VTS_WATCHDOG_INTERVAL", 10.0)?,
        };
        let request_timeout = seconds_var("VTS_REQUEST_TIMEOUT", 10.0)?;

        let expressions = map_var("VTS_EXPRESSIONS", default_expressions)?;
        let motions = map_var("VTS_MOTIONS", default_motions)?;

        let token_path = std::env::var("VTS_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./secrets/vtubestudio_auth_token.txt"));
        let resources_dir = std::env::var("VTS_RESOURCES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./resources"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            host,
            port,
            plugin,
            vtuber_name,
            latency,
            request_timeout,
            expressions,
            motions,
            token_path,
            resources_dir,
            log_level,
        })
    }

    /// Builds the session configuration handed to `VtsClient`.
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new(self.host.clone(), self.port)
            .with_token_path(self.token_path.clone())
            .with_resources_dir(Some(self.resources_dir.clone()))
            .with_latency(self.latency.clone())
            .with_request_timeout(self.request_timeout);
        client.plugin = self.plugin.clone();
        client.vtuber_name = self.vtuber_name.clone();
        client.expressions = self.expressions.clone();
        client.motions = self.motions.clone();
        client
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// A positive, finite number of seconds, fractions allowed.
fn seconds_var(name: &str, default: f64) -> Result<Duration, ConfigError> {
    let secs = parse_var(name, default)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a positive number of seconds", secs),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

/// Parses `key=Name,key=Name`. Unset or blank falls back to `default`.
fn map_var(
    name: &str,
    default: fn() -> HashMap<String, String>,
) -> Result<HashMap<String, String>, ConfigError> {
    let raw = match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(default()),
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a key=Name pair", entry),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "VTS_HOST",
        "VTS_PORT",
        "VTS_PLUGIN_NAME",
        "VTS_PLUGIN_DEVELOPER",
        "VTS_PLUGIN_ICON",
        "VTUBER_NAME",
        "VTS_LATENCY_WINDOW",
        "VTS_LATENCY_THRESHOLD",
        "VTS_WATCHDOG_INTERVAL",
        "VTS_REQUEST_TIMEOUT",
        "VTS_EXPRESSIONS",
        "VTS_MOTIONS",
        "VTS_TOKEN_PATH",
        "VTS_RESOURCES_DIR",
        "RUST_LOG",
    ];

    fn clear_env_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    fn invalid_var(err: ConfigError) -> String {
        let ConfigError::InvalidValue(var, _) = err;
        var
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

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8001);
        assert_eq!(config.vtuber_name, "Hiyori_A");
        assert_eq!(config.plugin, PluginIdentity::default());
        assert_eq!(config.latency, LatencyConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.expressions, default_expressions());
        assert_eq!(config.motions, default_motions());
        assert_eq!(
            config.token_path,
            PathBuf::from("./secrets/vtubestudio_auth_token.txt")
        );
        assert_eq!(config.resources_dir, PathBuf::from("./resources"));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_HOST", "192.168.1.20");
            env::set_var("VTS_PORT", "8002");
            env::set_var("VTS_PLUGIN_NAME", "Stream Buddy");
            env::set_var("VTS_PLUGIN_DEVELOPER", "someone");
            env::set_var("VTS_PLUGIN_ICON", "iVBORw0KGgo=");
            env::set_var("VTUBER_NAME", "Mao");
            env::set_var("VTS_LATENCY_WINDOW", "20");
            env::set_var("VTS_LATENCY_THRESHOLD", "0.5");
            env::set_var("VTS_WATCHDOG_INTERVAL", "2.5");
            env::set_var("VTS_REQUEST_TIMEOUT", "3");
            env::set_var("VTS_EXPRESSIONS", "happy=Mao_Smile, sad = Mao_Cry");
            env::set_var("VTS_MOTIONS", "wave=Mao_Wave");
            env::set_var("VTS_TOKEN_PATH", "/tmp/token.txt");
            env::set_var("VTS_RESOURCES_DIR", "/tmp/resources");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.host, "192.168.1.20");
        assert_eq!(config.port, 8002);
        assert_eq!(config.plugin.name, "Stream Buddy");
        assert_eq!(config.plugin.icon.as_deref(), Some("iVBORw0KGgo="));
        assert_eq!(config.vtuber_name, "Mao");
        assert_eq!(config.latency.window_capacity, 20);
        assert_eq!(config.latency.threshold, Duration::from_millis(500));
        assert_eq!(config.latency.watchdog_interval, Duration::from_millis(2500));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.expressions.len(), 2);
        assert_eq!(config.expressions["sad"], "Mao_Cry");
        assert_eq!(config.motions["wave"], "Mao_Wave");
        assert_eq!(config.log_level, Level::DEBUG);

        let client = config.client_config();
        assert_eq!(client.url(), "ws://192.168.1.20:8002/");
        assert_eq!(client.expression_name("happy"), Some("Mao_Smile"));
        assert_eq!(client.resources_dir, Some(PathBuf::from("/tmp/resources")));
        assert_eq!(client.token_path, PathBuf::from("/tmp/token.txt"));
        assert_eq!(client.request_timeout, Duration::from_secs(3));
        assert_eq!(client.vtuber_name, "Mao");
    }

    #[test]
    #[serial]
    fn test_config_invalid_port() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_PORT", "99999");
        }
        assert_eq!(invalid_var(Config::from_env().unwrap_err()), "VTS_PORT");
    }

    #[test]
    #[serial]
    fn test_config_rejects_non_positive_durations() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_LATENCY_THRESHOLD", "0");
        }
        assert_eq!(
            invalid_var(Config::from_env().unwrap_err()),
            "VTS_LATENCY_THRESHOLD"
        );

        clear_env_vars();
        unsafe {
            env::set_var("VTS_WATCHDOG_INTERVAL", "soon");
        }
        assert_eq!(
            invalid_var(Config::from_env().unwrap_err()),
            "VTS_WATCHDOG_INTERVAL"
        );
    }

    #[test]
    #[serial]
    fn test_config_rejects_overflowing_duration() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_WATCHDOG_INTERVAL", "1e30");
        }
        assert_eq!(
            invalid_var(Config::from_env().unwrap_err()),
            "VTS_WATCHDOG_INTERVAL"
        );
    }

    #[test]
    #[serial]
    fn test_config_rejects_empty_latency_window() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_LATENCY_WINDOW", "0");
        }
        assert_eq!(
            invalid_var(Config::from_env().unwrap_err()),
            "VTS_LATENCY_WINDOW"
        );
    }

    #[test]
    #[serial]
    fn test_config_rejects_malformed_mapping() {
        clear_env_vars();
        unsafe {
            env::set_var("VTS_EXPRESSIONS", "happy=Hiyori_Happy,sad");
        }
        assert_eq!(
            invalid_var(Config::from_env().unwrap_err()),
            "VTS_EXPRESSIONS"
        );
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }
        assert_eq!(invalid_var(Config::from_env().unwrap_err()), "RUST_LOG");
    }
}
