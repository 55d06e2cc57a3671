//! Wire model of the realtime channel.
//!
//! Outgoing control frames are `{"type": "subscribe_*", "filters": {...}}`
//! where `filters` is left out entirely when nothing would be filtered.
//! Incoming frames are `{"type": "...", "object": {...}}`.

use falu_api::endpoints::realtime::RealtimePurpose;
use serde::{Deserialize, Serialize};

/// A filter value that reduces to nothing when it would match everything
pub trait Collapse: Sized {
    fn collapse(self) -> Option<Self>;
}

impl<T> Collapse for Vec<T> {
    fn collapse(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

impl EventFilters {
    pub fn new(types: Vec<String>) -> Self {
        Self {
            types: Some(types),
        }
    }
}

impl Collapse for EventFilters {
    fn collapse(self) -> Option<Self> {
        let types = self.types.and_then(Collapse::collapse);
        types.is_some().then_some(Self { types })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestLogFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Collapse for RequestLogFilters {
    fn collapse(self) -> Option<Self> {
        let collapsed = Self {
            ip_addresses: self.ip_addresses.and_then(Collapse::collapse),
            methods: self.methods.and_then(Collapse::collapse),
            paths: self.paths.and_then(Collapse::collapse),
            status_codes: self.status_codes.and_then(Collapse::collapse),
            sources: self.sources.and_then(Collapse::collapse),
        };
        (collapsed != Self::default()).then_some(collapsed)
    }
}

/// Control messages sent by the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    SubscribeEvents {
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<EventFilters>,
    },
    SubscribeRequestLogs {
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<RequestLogFilters>,
    },
}

impl OutgoingMessage {
    pub fn subscribe_events(filters: EventFilters) -> Self {
        Self::SubscribeEvents {
            filters: filters.collapse(),
        }
    }

    pub fn subscribe_request_logs(filters: RequestLogFilters) -> Self {
        Self::SubscribeRequestLogs {
            filters: filters.collapse(),
        }
    }

    /// Negotiation purpose whose token authorizes this subscription
    pub fn purpose(&self) -> RealtimePurpose {
        match self {
            Self::SubscribeEvents { .. } => RealtimePurpose::Events,
            Self::SubscribeRequestLogs { .. } => RealtimePurpose::RequestLogs,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: serde_json::Value,
}

/// Messages pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Envelope")]
pub enum ChannelMessage {
    Event(serde_json::Value),
    RequestLog(serde_json::Value),
    /// A type this client does not know; skipped
    Unknown { kind: String },
}

impl From<Envelope> for ChannelMessage {
    fn from(envelope: Envelope) -> Self {
        match envelope.kind.as_str() {
            "event" => Self::Event(envelope.object),
            "request_log" => Self::RequestLog(envelope.object),
            _ => Self::Unknown {
                kind: envelope.kind,
            },
        }
    }
}

impl ChannelMessage {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Event(_) => "event",
            Self::RequestLog(_) => "request_log",
            Self::Unknown { kind } => kind,
        }
    }
}
