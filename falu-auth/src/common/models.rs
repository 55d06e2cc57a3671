use chrono::{serde::ts_seconds, DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::oidc::TokenSet;

/// Credentials persisted after a successful login or refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn from_token_set(tokens: TokenSet, now: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(tokens.expires_in).unwrap_or(i64::MAX);
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: now + Duration::seconds(lifetime.min(i64::from(i32::MAX))),
        }
    }
}

impl From<TokenSet> for StoredCredentials {
    fn from(tokens: TokenSet) -> Self {
        Self::from_token_set(tokens, Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
}

/// Everything the CLI keeps between invocations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub credentials: Option<StoredCredentials>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSummary>,
    #[serde(default)]
    pub default_workspace: Option<String>,
    #[serde(default)]
    pub default_live_mode: Option<bool>,
}
