//! Authenticated client with the refresh-retry protocol

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ClientError;
use super::refresh::{RefreshCoordinator, RefreshRole};
use super::{decode_json, PublicClient};
use crate::types::RefreshResponse;

/// Path prefixes that require a valid session. Auth failures on these
/// engage the refresh protocol; everything else propagates as-is.
///
/// Hard-coded mirror of the backend route table; update by hand when
/// routes change.
const PROTECTED_PREFIXES: &[&str] = &[
    "/api/email/",
    "/api/template/",
    "/api/upload/",
    "/api/user/update",
    "/api/mail/",
    "/api/ai/",
];

pub(crate) fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

struct Inner {
    client: reqwest::Client,
    base_url: String,
    access_token: ArcSwapOption<String>,
    refresh: RefreshCoordinator,
    on_session_expired: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Client for endpoints behind a session.
///
/// Requests carry the current bearer token plus the shared cookie jar.
/// A 401/403 from a protected path triggers exactly one silent refresh,
/// shared by every request failing while it is in flight, followed by
/// one replay of the original request.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<Inner>,
}

impl AuthenticatedClient {
    pub(crate) fn new(
        client: reqwest::Client,
        base_url: String,
        access_token: Option<String>,
        on_session_expired: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                base_url,
                access_token: ArcSwapOption::new(access_token.map(Arc::new)),
                refresh: RefreshCoordinator::new(),
                on_session_expired,
            }),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The bearer token currently attached to requests
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .access_token
            .load()
            .as_deref()
            .map(|token| token.to_string())
    }

    /// Replace (or drop) the bearer token
    pub fn set_access_token(&self, token: Option<String>) {
        self.inner.access_token.store(token.map(Arc::new));
    }

    /// A public client sharing this client's connection pool and cookie
    /// jar, for calling the auth endpoints
    pub fn to_public(&self) -> PublicClient {
        PublicClient::from_parts(self.inner.client.clone(), self.inner.base_url.clone())
    }

    /// Execute a request with the refresh-retry protocol.
    ///
    /// `customize` is called once per attempt to finish the request
    /// (body, query, multipart form), so a replay rebuilds the request
    /// instead of cloning a spent one.
    pub async fn execute<T, F>(
        &self,
        method: Method,
        path: &str,
        customize: F,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        match self.send_once(&method, path, &customize).await {
            Ok(value) => Ok(value),
            Err(error) if error.is_auth_expired() && is_protected(path) => {
                debug!(%path, "auth failure on protected path, engaging refresh");
                self.refresh_then_replay(method, path, customize).await
            }
            Err(error) => Err(error),
        }
    }

    /// One refresh episode followed by exactly one replay. A replay that
    /// fails again, with any status, propagates without another refresh.
    async fn refresh_then_replay<T, F>(
        &self,
        method: Method,
        path: &str,
        customize: F,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        match self.inner.refresh.begin() {
            RefreshRole::Leader(ticket) => match self.refresh_token().await {
                Ok(refresh) => {
                    if let Some(token) = refresh.access_token {
                        self.set_access_token(Some(token));
                    }
                    ticket.settle(Ok(()));
                }
                Err(refresh_error) => {
                    let message = refresh_error.to_string();
                    warn!(error = %message, "token refresh failed");
                    ticket.settle(Err(message.clone()));
                    self.notify_session_expired();
                    return Err(ClientError::RefreshFailed(message));
                }
            },
            RefreshRole::Follower(waiter) => {
                if let Err(message) = waiter.outcome().await {
                    return Err(ClientError::RefreshFailed(message));
                }
            }
        }

        self.send_once(&method, path, &customize).await
    }

    /// Call the refresh endpoint directly; never routed through
    /// [`Self::execute`], so it cannot re-enter the retry protocol.
    async fn refresh_token(&self) -> Result<RefreshResponse, ClientError> {
        let url = format!("{}/api/auth/refresh-token", self.inner.base_url);
        let mut request = self.inner.client.post(url).json(&serde_json::json!({}));
        if let Some(token) = self.inner.access_token.load().as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        decode_json(response).await
    }

    async fn send_once<T, F>(
        &self,
        method: &Method,
        path: &str,
        customize: &F,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let url = format!("{}{}", self.inner.base_url, path);
        let mut request = self.inner.client.request(method.clone(), url);
        if let Some(token) = self.inner.access_token.load().as_deref() {
            request = request.bearer_auth(token);
        }
        let response = customize(request).send().await?;
        decode_json(response).await
    }

    fn notify_session_expired(&self) {
        if let Some(hook) = &self.inner.on_session_expired {
            hook();
        }
    }
}
