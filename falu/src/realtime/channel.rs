use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::messages::{ChannelMessage, OutgoingMessage};
use super::transport::{CloseCode, Inbound, Transport};
use super::ChannelError;

/// How a streaming session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// The server closed the connection or the stream ended
    ClosedByPeer {
        code: Option<CloseCode>,
        reason: String,
    },
    /// User interrupt or token expiry
    Cancelled,
    /// The server sent something the channel cannot read; the socket was closed
    ProtocolViolation(String),
}

/// Consumer of decoded channel messages.
///
/// Calls are strictly sequential: the channel does not read the next frame
/// until `handle` returns. An `Err` is logged and the session continues.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(
        &mut self,
        message: ChannelMessage,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}

/// A subscribed realtime connection and its receive loop
pub struct RealtimeChannel<T> {
    transport: T,
    closed: bool,
}

impl<T: Transport> RealtimeChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            closed: false,
        }
    }

    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<(), ChannelError> {
        let payload = message.to_bytes()?;
        tracing::debug!(
            "Sending {} byte control message for {}",
            payload.len(),
            message.purpose()
        );
        self.transport.send(payload).await
    }

    /// Receive and dispatch messages until the peer closes, the token is
    /// cancelled or the peer violates the protocol.
    pub async fn run<H>(
        &mut self,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, ChannelError>
    where
        H: MessageHandler,
    {
        loop {
            let inbound = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.close(CloseCode::Normal, "client closing").await;
                    return Ok(SessionEnd::Cancelled);
                }
                inbound = self.transport.receive() => inbound,
            };

            let frame = match inbound {
                Ok(Some(Inbound::Frame(frame))) => frame,
                Ok(Some(Inbound::Close { code, reason })) => {
                    // tungstenite answers the close handshake on its own
                    self.closed = true;
                    tracing::info!(?code, %reason, "Realtime connection closed by server");
                    return Ok(SessionEnd::ClosedByPeer { code, reason });
                }
                Ok(None) => {
                    self.closed = true;
                    tracing::info!("Realtime stream ended");
                    return Ok(SessionEnd::ClosedByPeer {
                        code: None,
                        reason: String::new(),
                    });
                }
                Err(e) => {
                    self.closed = true;
                    return Err(e);
                }
            };

            // Fragmented messages are not reassembled
            if !frame.end_of_message {
                return Ok(self
                    .violation("fragmented messages are not supported")
                    .await);
            }

            let message = match ChannelMessage::from_slice(&frame.payload) {
                Ok(message) => message,
                Err(e) => {
                    return Ok(self.violation(&format!("unreadable message: {e}")).await);
                }
            };

            if let ChannelMessage::Unknown { ref kind } = message {
                tracing::warn!("Ignoring realtime message of unknown type '{}'", kind);
                continue;
            }

            let kind = message.kind().to_string();
            if let Err(e) = handler.handle(message, cancel).await {
                tracing::warn!("Failed to handle {} message: {:#}", kind, e);
            }
        }
    }

    async fn violation(&mut self, detail: &str) -> SessionEnd {
        tracing::warn!("Closing realtime connection: {}", detail);
        self.close(CloseCode::Invalid, detail).await;
        SessionEnd::ProtocolViolation(detail.to_string())
    }

    /// Close the socket unless that already happened
    pub(crate) async fn close(&mut self, code: CloseCode, reason: &str) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.transport.close(code, reason).await {
            tracing::debug!("Error while closing realtime connection: {}", e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
