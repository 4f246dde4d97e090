//! Typed clients for the massmail backend API

pub mod auth;
mod authenticated;
pub mod error;
pub mod mail;
mod refresh;
pub mod template;
pub mod upload;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

pub use authenticated::AuthenticatedClient;
use error::ClientError;

/// Client for the public auth endpoints that never require a session.
///
/// Auth failures here propagate directly; the refresh protocol only
/// exists on [`AuthenticatedClient`].
#[derive(Clone)]
pub struct PublicClient {
    client: reqwest::Client,
    base_url: String,
}

impl PublicClient {
    /// Create a new public client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        ClientBuilder::new().base_url(base_url).build_public()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder for an API path
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        decode_json(response).await
    }

    /// Fetch raw text from an absolute URL, e.g. a stored CSV file
    pub async fn fetch_text(&self, url: &str) -> Result<String, ClientError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.text().await?)
        } else {
            Err(error_from_response(status, response).await)
        }
    }

    pub(crate) fn from_parts(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

/// Builder for the public and authenticated clients.
///
/// Both clients built from one builder would share nothing; to share the
/// cookie jar, build the authenticated client and derive the public one
/// with [`AuthenticatedClient::to_public`].
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    access_token: Option<String>,
    on_session_expired: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: None,
            access_token: None,
            on_session_expired: None,
        }
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Seed the authenticated client with a previously issued token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Hook invoked when a token refresh fails and the session is gone.
    /// Consumers use this to clear their session state and point the
    /// user back at sign-in.
    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicClient, ClientError> {
        let (client, base_url) = self.into_parts()?;
        Ok(PublicClient { client, base_url })
    }

    /// Build an authenticated client
    pub fn build_authenticated(self) -> Result<AuthenticatedClient, ClientError> {
        let access_token = self.access_token.clone();
        let on_session_expired = self.on_session_expired.clone();
        let (client, base_url) = self.into_parts()?;
        Ok(AuthenticatedClient::new(
            client,
            base_url,
            access_token,
            on_session_expired,
        ))
    }

    fn into_parts(self) -> Result<(reqwest::Client, String), ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = reqwest::ClientBuilder::new().cookie_store(true);

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder
                .user_agent(concat!("massmail-client/", env!("CARGO_PKG_VERSION")));
        }

        Ok((client_builder.build()?, base_url))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a JSON success body, or translate the error status using the
/// server's `{message}` body when one is present
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        Err(error_from_response(status, response).await)
    }
}

pub(crate) async fn error_from_response(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> ClientError {
    let text = response.text().await.unwrap_or_else(|_| status.to_string());
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);
    ClientError::from_status(status, message)
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
