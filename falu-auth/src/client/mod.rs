mod config;
mod credential_store;
pub mod oidc;

pub use config::Settings;
pub use credential_store::CredentialStore;

use tokio_util::sync::CancellationToken;

use crate::common::StoredCredentials;
use crate::error::AuthError;
use oidc::{DeviceAuthFlow, DeviceAuthorization, OidcProvider};

#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Only print the verification URL instead of launching a browser
    pub no_browser: bool,
}

/// Steps of an interactive login the caller should show to the user
#[derive(Debug)]
pub enum LoginPrompt<'a> {
    /// The code to confirm and where to confirm it
    Authorization(&'a DeviceAuthorization),
    BrowserOpened(&'a str),
    BrowserFailed { uri: &'a str, error: std::io::Error },
    /// Polling the token endpoint until the user approves
    Waiting,
}

/// Load stored credentials, refreshing them when they are about to expire
pub async fn authenticate<P: OidcProvider>(
    provider: P,
    store: &CredentialStore,
    cancel: &CancellationToken,
) -> Result<StoredCredentials, AuthError> {
    let Some(credentials) = store.load()?.credentials else {
        return Err(AuthError::NotLoggedIn);
    };

    if !store.is_expired(&credentials) {
        return Ok(credentials);
    }

    let Some(ref refresh_token) = credentials.refresh_token else {
        tracing::info!("Stored token expired and cannot be refreshed");
        return Err(AuthError::NotLoggedIn);
    };

    tracing::info!("Access token expired, attempting to refresh");
    if cancel.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    let flow = DeviceAuthFlow::new(provider);
    let refreshed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AuthError::Cancelled),
        refreshed = flow.refresh(refresh_token) => refreshed,
    };

    match refreshed {
        Ok(tokens) => {
            let mut refreshed = StoredCredentials::from(tokens);
            // Providers may omit the refresh token when it is not rotated
            if refreshed.refresh_token.is_none() {
                refreshed.refresh_token = credentials.refresh_token.clone();
            }
            store.save_credentials(&refreshed)?;
            tracing::info!("Access token refreshed");
            Ok(refreshed)
        }
        Err(e) => {
            tracing::warn!("Failed to refresh token: {}", e);
            let mut file = store.load()?;
            file.credentials = None;
            store.save(&file)?;
            Err(AuthError::NotLoggedIn)
        }
    }
}

/// Run the device authorization grant and persist the resulting credentials.
/// Every step the user has to act on is handed to `prompt`.
pub async fn login<P, F>(
    provider: P,
    store: &CredentialStore,
    browser_delay: std::time::Duration,
    options: &LoginOptions,
    cancel: &CancellationToken,
    mut prompt: F,
) -> Result<StoredCredentials, AuthError>
where
    P: OidcProvider,
    F: FnMut(LoginPrompt<'_>),
{
    let flow = DeviceAuthFlow::new(provider);

    if cancel.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    let authorization = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AuthError::Cancelled),
        authorization = flow.request_device_authorization() => authorization?,
    };

    prompt(LoginPrompt::Authorization(&authorization));

    if !options.no_browser {
        // Give the user a moment to read the code before the browser takes focus
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            _ = tokio::time::sleep(browser_delay) => {}
        }

        let uri = authorization.browser_uri();
        match open::that(uri) {
            Ok(()) => prompt(LoginPrompt::BrowserOpened(uri)),
            Err(error) => prompt(LoginPrompt::BrowserFailed { uri, error }),
        }
    }

    prompt(LoginPrompt::Waiting);
    let poll = flow.poll_for_token(
        &authorization.device_code,
        authorization.poll_interval(),
        cancel,
    );
    let tokens = tokio::time::timeout(authorization.expires_in(), poll)
        .await
        .map_err(|_| AuthError::Timeout)??;

    let credentials = StoredCredentials::from(tokens);
    store.save_credentials(&credentials)?;

    Ok(credentials)
}

pub fn logout(store: &CredentialStore) -> Result<(), AuthError> {
    store.clear()
}
