use std::time::Duration;

/// Errors surfaced by the VTube Studio client.
///
/// Authentication variants abort `connect()`. Everything else fails only the
/// command that produced it and leaves the session usable.
#[derive(Debug, thiserror::Error)]
pub enum VtsError {
    /// The socket could not be established or was lost.
    #[error("transport error: {0}")]
    Transport(String),
    /// The host did not answer an authentication exchange in time.
    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),
    /// The host rejected the plugin's credentials.
    #[error("authentication denied: {0}")]
    AuthDenied(String),
    /// Unexpected message type or a payload that does not decode.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The host answered with an `APIError` message.
    #[error("API error {error_id}: {message}")]
    Api { error_id: i64, message: String },
    /// A command exchange did not complete within the request timeout.
    #[error("{message_type} timed out after {after:?}")]
    RequestTimeout {
        message_type: &'static str,
        after: Duration,
    },
    /// A key that is not present in the configured mappings or hotkey list.
    #[error("unknown {kind} key: {key}")]
    UnknownKey { kind: &'static str, key: String },
    /// A command was attempted before the session was authenticated.
    #[error("session is not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for VtsError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        VtsError::Transport(e.to_string())
    }
}

pub type Result<T, E = VtsError> = std::result::Result<T, E>;
