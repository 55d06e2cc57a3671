use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::Request;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: String,
    pub url: String,
    /// Event types delivered to this endpoint; `*` means all
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Signing secret used to produce the signature header
    #[serde(default)]
    pub secret: Option<String>,
}

impl WebhookEndpoint {
    pub fn receives_all_events(&self) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == "*")
    }
}

// Requests

#[derive(Debug, Clone)]
pub struct GetWebhookEndpoint {
    id: String,
}

impl GetWebhookEndpoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Request for GetWebhookEndpoint {
    type Data = ();
    type Response = WebhookEndpoint;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/v1/webhooks/{}", self.id).into()
    }
}
