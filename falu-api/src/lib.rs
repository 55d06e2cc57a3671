pub mod endpoints;
mod error;
mod macros;
pub mod repositories;

pub use crate::error::{FaluApiError, ProblemDetails};
use crate::macros::setter;
use repositories::*;
use secrecy::{ExposeSecret, SecretString};
use tower_api_client::header::{HeaderMap, HeaderValue, InvalidHeaderValue, USER_AGENT};
use tower_api_client::{Client as ApiClient, Error as ApiError, Request as ApiRequest};

pub const BASE_URL: &str = "https://api.falu.io";
pub const APP_USER_AGENT: &str = concat!("falu-cli/", env!("CARGO_PKG_VERSION"));

const WORKSPACE_HEADER: &str = "x-workspace-id";
const LIVE_MODE_HEADER: &str = "x-live-mode";

/// Workspace and live-mode context applied to every request a client sends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub workspace: Option<String>,
    pub live: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt workspace: String);
    setter!(opt live: bool);

    fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
        if let Some(ref workspace) = self.workspace {
            headers.insert(WORKSPACE_HEADER, HeaderValue::from_str(workspace)?);
        }
        if let Some(live) = self.live {
            let value = if live { "true" } else { "false" };
            headers.insert(LIVE_MODE_HEADER, HeaderValue::from_static(value));
        }
        Ok(headers)
    }
}

pub struct Client {
    inner: ApiClient,
    options: RequestOptions,
}

impl Client {
    /// Create a client authenticated with an access token or API key
    pub fn new(credential: impl Into<SecretString>) -> Self {
        Self::with_base_url(BASE_URL, credential)
    }

    pub fn with_base_url(base_url: impl Into<String>, credential: impl Into<SecretString>) -> Self {
        let base_url = base_url.into();
        let credential = credential.into();
        Self {
            inner: ApiClient::new(base_url.trim_end_matches('/'))
                .bearer_auth(credential.expose_secret()),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, FaluApiError>
    where
        R: ApiRequest,
    {
        let headers = self
            .options
            .headers()
            .map_err(|e| FaluApiError::Internal(ApiError::Http(e.into())))?;

        self.inner
            .clone()
            .default_headers(headers)
            .send(request)
            .await
            .map_err(From::from)
    }
}

pub struct Request;

impl Request {
    pub fn realtime() -> RealtimeRepository {
        RealtimeRepository::new()
    }

    pub fn webhooks() -> WebhookRepository {
        WebhookRepository::new()
    }

    pub fn workspaces() -> WorkspaceRepository {
        WorkspaceRepository::new()
    }
}
