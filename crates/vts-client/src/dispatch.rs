//! Request/response correlation over a single socket.
//!
//! A reader task owns the receive half and routes every response to the
//! pending slot registered under its `requestID`. Callers therefore may issue
//! exchanges concurrently without responses being cross-delivered.

use crate::error::{Result, VtsError};
use crate::protocol::{MessageType, RequestEnvelope, ResponseEnvelope};
use crate::transport::{self, FrameReader, FrameWriter};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::{self, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Removes the pending slot when an exchange ends early (timeout, send error
/// or the caller's future being dropped).
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(self.request_id);
    }
}

/// An open, correlated connection to the host.
pub struct Connection {
    writer: sync::Mutex<FrameWriter>,
    pending: PendingMap,
    reader_handle: JoinHandle<()>,
}

impl Connection {
    /// Connects to `url` and starts the response reader task.
    pub async fn open(url: &str) -> Result<Self> {
        let (writer, reader) = transport::connect(url).await?;
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_handle = tokio::spawn(run_reader(reader, pending.clone()));
        Ok(Self {
            writer: sync::Mutex::new(writer),
            pending,
            reader_handle,
        })
    }

    /// Sends one request and waits up to `timeout` for its response.
    ///
    /// Returns the raw envelope; interpreting `APIError` and the expected
    /// message type is left to the caller.
    pub async fn exchange(
        &self,
        message_type: MessageType,
        data: Option<Value>,
        timeout: Duration,
    ) -> Result<ResponseEnvelope> {
        let request_id = format!("{}_{}", message_type.id_prefix(), Uuid::new_v4().simple());
        let envelope = RequestEnvelope::new(request_id.clone(), message_type, data);
        let payload = serde_json::to_string(&envelope)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            request_id: &request_id,
        };

        debug!(%request_id, message_type = message_type.request(), "Sending request.");
        self.writer.lock().await.send(payload).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(VtsError::Transport(
                "connection closed before a response arrived".to_string(),
            )),
            Err(_) => Err(VtsError::RequestTimeout {
                message_type: message_type.request(),
                after: timeout,
            }),
        }
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Closes the socket and stops the reader. Outstanding exchanges fail
    /// with a transport error.
    pub async fn close(mut self) -> Result<()> {
        let result = self.writer.lock().await.close().await;
        self.reader_handle.abort();
        let _ = (&mut self.reader_handle).await;
        self.pending.lock().clear();
        result
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

async fn run_reader(mut reader: FrameReader, pending: PendingMap) {
    while let Some(frame) = reader.recv().await {
        let text = match frame {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Error reading from VTube Studio WebSocket.");
                break;
            }
        };
        let response = match serde_json::from_str::<ResponseEnvelope>(&text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, raw = %text, "Discarding unparseable frame.");
                continue;
            }
        };
        let slot = response
            .request_id
            .as_deref()
            .and_then(|id| pending.lock().remove(id));
        match slot {
            Some(tx) => {
                // The waiter may have timed out in the meantime.
                let _ = tx.send(response);
            }
            None => warn!(
                request_id = ?response.request_id,
                message_type = %response.message_type,
                "Discarding response with no pending request."
            ),
        }
    }
    // Dropping the senders wakes every waiter with a closed-channel error.
    pending.lock().clear();
    debug!("Response reader stopped.");
}
