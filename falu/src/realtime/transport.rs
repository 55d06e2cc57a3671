use async_trait::async_trait;
use falu_api::endpoints::realtime::RealtimeNegotiation;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use super::ChannelError;

/// Application framing version announced during the handshake
pub const SUB_PROTOCOL: &str = "falu.v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// Control frame payload limit minus the two-byte close code
const MAX_CLOSE_REASON: usize = 123;

/// One data frame as handed over by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub payload: Vec<u8>,
    /// False when the message continues in a later frame
    pub end_of_message: bool,
}

impl Frame {
    pub fn complete(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            end_of_message: true,
        }
    }

    pub fn partial(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            end_of_message: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Frame(Frame),
    Close {
        code: Option<CloseCode>,
        reason: String,
    },
}

/// Byte-level duplex connection underneath a realtime channel.
///
/// Partial frames are only seen from transports that surface websocket
/// fragments. [`WebSocketTransport`] reads through tungstenite, which
/// reassembles fragmented messages, so every frame it yields is complete.
#[async_trait]
pub trait Transport: Send {
    /// Write one complete binary frame
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Wait for the next inbound frame; `None` once the stream has ended
    async fn receive(&mut self) -> Result<Option<Inbound>, ChannelError>;

    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), ChannelError>;
}

pub struct WebSocketTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport").finish_non_exhaustive()
    }
}

impl WebSocketTransport {
    /// Open the websocket described by a negotiation, presenting its token
    /// as a bearer credential. Failures are not retried.
    pub async fn connect(negotiation: &RealtimeNegotiation) -> Result<Self, ChannelError> {
        let mut request = negotiation
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Connect(format!("invalid realtime URL: {e}")))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", negotiation.token))
            .map_err(|e| ChannelError::Connect(format!("invalid realtime token: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUB_PROTOCOL));

        tracing::debug!(url = %negotiation.url, "Connecting to realtime endpoint");

        let (ws, response) = timeout(CONNECT_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| ChannelError::Connect("connection timed out".into()))?
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "Realtime websocket connected");
        Ok(Self { ws })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.ws
            .send(Message::Binary(payload))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn receive(&mut self) -> Result<Option<Inbound>, ChannelError> {
        loop {
            let message = match self.ws.next().await {
                None => return Ok(None),
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(e)) => return Err(ChannelError::Receive(e.to_string())),
            };

            match message {
                Message::Binary(payload) => return Ok(Some(Inbound::Frame(Frame::complete(payload)))),
                Message::Text(text) => {
                    return Ok(Some(Inbound::Frame(Frame::complete(text.into_bytes()))))
                }
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(frame.code), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    return Ok(Some(Inbound::Close { code, reason }));
                }
                // Pings are answered by tungstenite itself; raw frames are write-only
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), ChannelError> {
        let frame = CloseFrame {
            code,
            reason: truncate_reason(reason).to_owned().into(),
        };
        match self.ws.close(Some(frame)).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ChannelError::Send(e.to_string())),
        }
    }
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_fits_control_frame() {
        assert_eq!(truncate_reason("client closing"), "client closing");

        let long = "é".repeat(100);
        let truncated = truncate_reason(&long);
        assert!(truncated.len() <= MAX_CLOSE_REASON);
        assert_eq!(truncated.len(), 122);
    }
}
