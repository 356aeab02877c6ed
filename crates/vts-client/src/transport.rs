//! Framed WebSocket transport to the VTube Studio host.

use crate::error::{Result, VtsError};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the socket and splits it into its send and receive halves.
pub async fn connect(url: &str) -> Result<(FrameWriter, FrameReader)> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| VtsError::Transport(format!("failed to connect to {url}: {e}")))?;
    info!(%url, "Connected to VTube Studio WebSocket.");
    let (sink, stream) = ws_stream.split();
    Ok((FrameWriter { sink }, FrameReader { stream }))
}

/// Send half of the socket.
pub struct FrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter {
    pub async fn send(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Sends a close frame. A socket the peer already dropped is not an error.
    pub async fn close(&mut self) -> Result<()> {
        match self.sink.close().await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Receive half of the socket.
pub struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// Next text frame, or `None` once the peer closes the connection.
    ///
    /// Control and binary frames are skipped.
    pub async fn recv(&mut self) -> Option<Result<String>> {
        while let Some(msg_result) = self.stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(close_frame)) => {
                    info!(?close_frame, "VTube Studio closed the connection.");
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    warn!(len = data.len(), "Ignoring unexpected binary frame.");
                }
                Ok(_) => debug!("Ignoring control frame."),
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}
