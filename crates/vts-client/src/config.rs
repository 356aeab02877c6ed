//! Immutable client configuration, passed into [`crate::VtsClient`] at construction.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Identity the plugin presents to VTube Studio during authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginIdentity {
    pub name: String,
    pub developer: String,
    /// Optional base64-encoded 128x128 PNG shown in the approval popup.
    pub icon: Option<String>,
}

impl Default for PluginIdentity {
    fn default() -> Self {
        Self {
            name: "VTube Pilot".to_string(),
            developer: "vtube-pilot".to_string(),
            icon: None,
        }
    }
}

/// Latency window and watchdog tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct LatencyConfig {
    /// Number of recent round trips kept for aggregation (default: 100)
    pub window_capacity: usize,
    /// Mean latency above which the alert hook fires (default: 2 seconds)
    pub threshold: Duration,
    /// Period between watchdog wakes (default: 10 seconds)
    pub watchdog_interval: Duration,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            threshold: Duration::from_secs(2),
            watchdog_interval: Duration::from_secs(10),
        }
    }
}

/// Everything a session needs to connect, authenticate and issue commands.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub vtuber_name: String,
    pub plugin: PluginIdentity,
    pub latency: LatencyConfig,
    /// Logical expression keys mapped to the host's expression names.
    pub expressions: HashMap<String, String>,
    /// Logical motion keys mapped to the host's motion names.
    pub motions: HashMap<String, String>,
    pub token_path: PathBuf,
    /// Snapshot directory; `None` disables snapshot files.
    pub resources_dir: Option<PathBuf>,
    /// Wait applied to every ordinary command exchange.
    pub request_timeout: Duration,
    /// Wait for the user to approve the plugin in VTube Studio.
    pub token_timeout: Duration,
    /// Wait for the session authentication response.
    pub auth_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            vtuber_name: "Hiyori_A".to_string(),
            plugin: PluginIdentity::default(),
            latency: LatencyConfig::default(),
            expressions: default_expressions(),
            motions: default_motions(),
            token_path: PathBuf::from("./secrets/vtubestudio_auth_token.txt"),
            resources_dir: Some(PathBuf::from("./resources")),
            request_timeout: Duration::from_secs(10),
            token_timeout: Duration::from_secs(30),
            auth_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// WebSocket URL of the host API.
    pub fn url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.port)
    }

    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    #[must_use]
    pub fn with_resources_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.resources_dir = dir;
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: LatencyConfig) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auth_timeouts(mut self, token: Duration, auth: Duration) -> Self {
        self.token_timeout = token;
        self.auth_timeout = auth;
        self
    }

    pub fn expression_name(&self, key: &str) -> Option<&str> {
        self.expressions.get(key).map(String::as_str)
    }

    pub fn motion_name(&self, key: &str) -> Option<&str> {
        self.motions.get(key).map(String::as_str)
    }

    /// Reverse lookup from a host expression name to its configured key.
    /// When several keys share the name, the alphabetically first one wins.
    pub fn expression_key(&self, name: &str) -> Option<&str> {
        reverse_lookup(&self.expressions, name)
    }

    /// Reverse lookup from a host motion name to its configured key.
    pub fn motion_key(&self, name: &str) -> Option<&str> {
        reverse_lookup(&self.motions, name)
    }
}

fn reverse_lookup<'a>(map: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    map.iter()
        .filter(|(_, v)| v.as_str() == name)
        .map(|(k, _)| k.as_str())
        .min()
}

/// Expression names of the bundled Hiyori_A model.
pub fn default_expressions() -> HashMap<String, String> {
    [
        ("happy", "Hiyori_Happy"),
        ("sad", "Hiyori_Sad"),
        ("thinking", "Hiyori_Thinking"),
        ("concerned", "Hiyori_Concerned"),
        ("neutral", "Hiyori_Neutral"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn default_motions() -> HashMap<String, String> {
    [("wave", "Hiyori_Wave"), ("nod", "Hiyori_Nod")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
