use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An HTTP request made against the API, as recorded by the request log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub id: String,
    pub created: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client that made the request (dashboard, api, cli, ...)
    #[serde(default)]
    pub source: Option<String>,
    /// Time taken to serve the request, in milliseconds
    #[serde(default)]
    pub duration: Option<f64>,
}
