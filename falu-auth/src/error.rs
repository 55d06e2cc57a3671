use thiserror::Error;

use crate::client::oidc::OidcErrorBody;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential storage error: {0}")]
    CredentialStorage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider rejected the request
    #[error("OIDC error: {0}")]
    Oidc(OidcErrorBody),

    #[error("Unexpected response from identity provider ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Device code expired before authorization completed")]
    Timeout,

    #[error("Authentication cancelled")]
    Cancelled,

    #[error("Not logged in, run `falu login` or pass --api-key")]
    NotLoggedIn,
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
