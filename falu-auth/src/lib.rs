// Types persisted on disk and shared with callers
pub mod common;

mod client;
mod error;

pub use client::oidc::{
    DeviceAuthFlow, DeviceAuthorization, DeviceAuthorizationResponse, OidcClient, OidcErrorBody,
    OidcProvider, TokenEndpointResponse, TokenSet, SLOW_DOWN_INCREMENT,
};
pub use client::{
    authenticate, login, logout, CredentialStore, LoginOptions, LoginPrompt, Settings,
};
pub use common::{CredentialsFile, StoredCredentials, WorkspaceSummary};
pub use error::AuthError;
