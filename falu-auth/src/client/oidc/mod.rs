mod models;

pub use models::{
    DeviceAuthorization, DeviceAuthorizationResponse, OidcErrorBody, TokenEndpointResponse, TokenSet,
};
use models::{AUTHORIZATION_PENDING, DEVICE_CODE_GRANT_TYPE, REFRESH_TOKEN_GRANT_TYPE, SLOW_DOWN};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::Settings;
use crate::error::AuthError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Added to the polling interval every time the provider answers `slow_down`
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Endpoints of an identity provider used by the device authorization grant
#[async_trait]
pub trait OidcProvider: Send + Sync {
    async fn device_authorization(&self) -> Result<DeviceAuthorizationResponse, AuthError>;

    async fn device_token(&self, device_code: &str) -> Result<TokenEndpointResponse, AuthError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenEndpointResponse, AuthError>;
}

/// HTTP client for the identity provider's device and token endpoints
pub struct OidcClient {
    http_client: Client,
    authority: String,
    client_id: String,
    scope: String,
}

impl OidcClient {
    pub fn new(settings: &Settings) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            authority: settings.authority.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            scope: settings.scope.clone(),
        })
    }

    /// Post a form and decode the body whatever the status; providers report
    /// OIDC errors with 400 responses carrying an `error` field
    async fn post_form<T>(&self, path: &str, form: &[(&str, &str)]) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.authority, path);
        let resp = self.http_client.post(&url).form(form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| {
            if status.is_success() {
                AuthError::Json(e)
            } else {
                AuthError::UnexpectedResponse {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                }
            }
        })
    }
}

#[async_trait]
impl OidcProvider for OidcClient {
    async fn device_authorization(&self) -> Result<DeviceAuthorizationResponse, AuthError> {
        self.post_form(
            "/device/authorize",
            &[("client_id", self.client_id.as_str()), ("scope", self.scope.as_str())],
        )
        .await
    }

    async fn device_token(&self, device_code: &str) -> Result<TokenEndpointResponse, AuthError> {
        self.post_form(
            "/token",
            &[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("client_id", self.client_id.as_str()),
                ("device_code", device_code),
            ],
        )
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenEndpointResponse, AuthError> {
        self.post_form(
            "/token",
            &[
                ("grant_type", REFRESH_TOKEN_GRANT_TYPE),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }
}

/// OAuth2 device authorization grant on top of an [`OidcProvider`]
pub struct DeviceAuthFlow<P> {
    provider: P,
}

impl<P: OidcProvider> DeviceAuthFlow<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Start a login attempt; provider errors are final
    pub async fn request_device_authorization(&self) -> Result<DeviceAuthorization, AuthError> {
        match self.provider.device_authorization().await? {
            DeviceAuthorizationResponse::Authorization(authorization) => Ok(authorization),
            DeviceAuthorizationResponse::Error(error) => Err(AuthError::Oidc(error)),
        }
    }

    /// Poll the token endpoint until the user completes authorization.
    ///
    /// The first request goes out immediately. `authorization_pending` waits
    /// `interval` before retrying; `slow_down` grows the interval by
    /// [`SLOW_DOWN_INCREMENT`] for this and every later wait. Any other error
    /// ends polling. Cancellation is observed before each request and during
    /// each request and wait.
    pub async fn poll_for_token(
        &self,
        device_code: &str,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<TokenSet, AuthError> {
        let mut interval = interval;

        loop {
            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                response = self.provider.device_token(device_code) => response?,
            };

            match response {
                TokenEndpointResponse::Tokens(tokens) => {
                    tracing::info!("Device authorization completed");
                    return Ok(tokens);
                }
                TokenEndpointResponse::Error(error) if error.error == AUTHORIZATION_PENDING => {
                    tracing::debug!("Authorization pending, retrying in {:?}", interval);
                }
                TokenEndpointResponse::Error(error) if error.error == SLOW_DOWN => {
                    interval += SLOW_DOWN_INCREMENT;
                    tracing::debug!("Provider asked to slow down, interval now {:?}", interval);
                }
                TokenEndpointResponse::Error(error) => {
                    tracing::warn!("Device authorization failed: {}", error);
                    return Err(AuthError::Oidc(error));
                }
            }

            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        match self.provider.refresh_token(refresh_token).await? {
            TokenEndpointResponse::Tokens(tokens) => Ok(tokens),
            TokenEndpointResponse::Error(error) => Err(AuthError::Oidc(error)),
        }
    }
}
