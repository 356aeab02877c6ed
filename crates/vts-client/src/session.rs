//! Manages the VTube Studio session lifecycle, from connect and authentication
//! to shutdown.

use crate::{
    config::ClientConfig,
    dispatch::Connection,
    error::{Result, VtsError},
    latency::LatencyMonitor,
    protocol::{
        ApiErrorData, AuthenticationRequestData, AuthenticationResponseData,
        AuthenticationTokenRequestData, AuthenticationTokenResponseData, MessageType,
        ResponseEnvelope,
    },
    snapshot::SnapshotWriter,
    token::TokenStore,
    watchdog::{AlertHook, LogAlert, Watchdog},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Session states. `Failed` and `Closed` are reachable from any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    TokenRequested,
    Authenticating,
    Authenticated,
    Failed,
    Closed,
}

/// A control session with a VTube Studio instance.
///
/// Commands take `&self` and may run concurrently; `connect` and `close`
/// need exclusive access.
pub struct VtsClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) tokens: TokenStore,
    pub(crate) snapshots: SnapshotWriter,
    pub(crate) latency: LatencyMonitor,
    alert_hook: Arc<dyn AlertHook>,
    state: SessionState,
    pub(crate) connection: Option<Connection>,
    watchdog: Option<Watchdog>,
}

impl VtsClient {
    pub fn new(config: ClientConfig) -> Self {
        let tokens = TokenStore::new(config.token_path.clone());
        let snapshots = SnapshotWriter::new(config.resources_dir.clone());
        let latency = LatencyMonitor::new(config.latency.window_capacity);
        Self {
            config: Arc::new(config),
            tokens,
            snapshots,
            latency,
            alert_hook: Arc::new(LogAlert),
            state: SessionState::Disconnected,
            connection: None,
            watchdog: None,
        }
    }

    /// Replaces the default log-only alert hook.
    #[must_use]
    pub fn with_alert_hook(mut self, hook: Arc<dyn AlertHook>) -> Self {
        self.alert_hook = hook;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Shared handle to the latency window fed by expression and motion commands.
    pub fn latency(&self) -> &LatencyMonitor {
        &self.latency
    }

    pub fn watchdog_running(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Connects, authenticates and starts the latency watchdog.
    ///
    /// On failure the socket is closed, the state becomes `Failed` and no
    /// watchdog is started.
    #[instrument(name = "vts_connect", skip_all, fields(url = %self.config.url()))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            self.close().await;
        }
        self.state = SessionState::Connecting;
        let url = self.config.url();
        info!("Connecting to {url}");

        let connection = match Connection::open(&url).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(error = %e, "Failed to connect to VTube Studio.");
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        if let Err(e) = self.authenticate(&connection).await {
            error!(error = %e, "Authentication failed, closing connection.");
            self.state = SessionState::Failed;
            if let Err(close_err) = connection.close().await {
                warn!(error = %close_err, "Error while closing connection.");
            }
            return Err(e);
        }

        self.connection = Some(connection);
        self.state = SessionState::Authenticated;
        self.watchdog = Some(Watchdog::spawn(
            self.latency.clone(),
            self.config.latency.threshold,
            self.config.latency.watchdog_interval,
            self.alert_hook.clone(),
        ));
        info!("Connected and authenticated with VTube Studio API.");
        Ok(())
    }

    async fn authenticate(&mut self, connection: &Connection) -> Result<()> {
        info!("Starting authentication.");
        let token = match self.tokens.load().await? {
            Some(token) => token,
            None => {
                self.state = SessionState::TokenRequested;
                let token = self.request_token(connection).await?;
                self.tokens.store(&token).await?;
                token
            }
        };

        self.state = SessionState::Authenticating;
        let plugin = &self.config.plugin;
        let data = serde_json::to_value(AuthenticationRequestData {
            plugin_name: &plugin.name,
            plugin_developer: &plugin.developer,
            authentication_token: &token,
        })?;
        let response = auth_exchange(
            connection,
            MessageType::Authentication,
            data,
            self.config.auth_timeout,
        )
        .await?;
        let result: AuthenticationResponseData =
            decode_auth(response, MessageType::Authentication)?;
        if result.authenticated {
            info!("Authentication succeeded.");
            Ok(())
        } else {
            let reason = result.reason.unwrap_or_else(|| "unknown reason".to_string());
            Err(VtsError::AuthDenied(reason))
        }
    }

    /// Asks the host for a new token. The user must approve the plugin in
    /// VTube Studio within the token timeout.
    async fn request_token(&self, connection: &Connection) -> Result<String> {
        let plugin = &self.config.plugin;
        let data = serde_json::to_value(AuthenticationTokenRequestData {
            plugin_name: &plugin.name,
            plugin_developer: &plugin.developer,
            plugin_icon: plugin.icon.as_deref(),
        })?;
        info!("Requesting authentication token, please approve the plugin in VTube Studio.");
        let response = auth_exchange(
            connection,
            MessageType::AuthenticationToken,
            data,
            self.config.token_timeout,
        )
        .await?;
        let issued: AuthenticationTokenResponseData =
            decode_auth(response, MessageType::AuthenticationToken)?;
        info!("Authentication token issued.");
        Ok(issued.authentication_token)
    }

    /// Stops the watchdog, closes the socket and clears the authenticated gate.
    ///
    /// Idempotent and safe to call when `connect` never succeeded.
    pub async fn close(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.shutdown().await;
        }
        if let Some(connection) = self.connection.take() {
            match connection.close().await {
                Ok(()) => info!("Closed connection to VTube Studio."),
                Err(e) => warn!(error = %e, "Error while closing connection."),
            }
        }
        self.state = SessionState::Closed;
    }

    /// The open connection, provided the session is authenticated.
    pub(crate) fn ready(&self, operation: &str) -> Result<&Connection> {
        match (&self.connection, self.state) {
            (Some(connection), SessionState::Authenticated) => Ok(connection),
            _ => {
                warn!(operation, "Not authenticated, ignoring command.");
                Err(VtsError::NotAuthenticated)
            }
        }
    }
}

async fn auth_exchange(
    connection: &Connection,
    message_type: MessageType,
    data: serde_json::Value,
    timeout: Duration,
) -> Result<ResponseEnvelope> {
    match connection.exchange(message_type, Some(data), timeout).await {
        Err(VtsError::RequestTimeout { after, .. }) => Err(VtsError::AuthTimeout(after)),
        other => other,
    }
}

/// Decodes an authentication reply; an `APIError` counts as a denial.
fn decode_auth<T: serde::de::DeserializeOwned>(
    response: ResponseEnvelope,
    message_type: MessageType,
) -> Result<T> {
    if response.is_api_error() {
        let message = serde_json::from_value::<ApiErrorData>(response.data)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(VtsError::AuthDenied(message));
    }
    crate::commands::interpret(response, message_type)
}
