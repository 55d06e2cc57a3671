use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;
use tower_api_client::{Method, Request, RequestData};

// Common

/// Which stream a negotiated realtime token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimePurpose {
    Events,
    RequestLogs,
}

impl Display for RealtimePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Events => f.write_str("events"),
            Self::RequestLogs => f.write_str("request_logs"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Websocket,
}

/// Short-lived credential for opening one realtime connection
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeNegotiation {
    /// Websocket endpoint to connect to
    pub url: String,
    /// Bearer token presented during the websocket handshake
    pub token: String,
    /// Instant after which the token (and any session opened with it) is no longer valid
    pub expires: DateTime<Utc>,
    /// Opaque correlation value echoed by the server
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub live: bool,
}

impl std::fmt::Debug for RealtimeNegotiation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeNegotiation")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("expires", &self.expires)
            .field("state", &self.state)
            .field("workspace", &self.workspace)
            .field("live", &self.live)
            .finish()
    }
}

// Requests

#[derive(Debug, Clone, Serialize)]
pub struct NegotiateRealtime {
    #[serde(rename = "type")]
    connection_type: ConnectionType,
    purpose: RealtimePurpose,
}

impl NegotiateRealtime {
    pub fn new(purpose: RealtimePurpose) -> Self {
        Self {
            connection_type: ConnectionType::Websocket,
            purpose,
        }
    }
}

impl Request for NegotiateRealtime {
    type Data = Self;
    type Response = RealtimeNegotiation;

    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/v1/realtime/negotiate/{}", self.purpose).into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }
}
