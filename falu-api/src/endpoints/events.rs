use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A domain event as delivered over the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub live: bool,
    /// The object the event refers to, left untyped
    #[serde(default)]
    pub data: serde_json::Value,
}
