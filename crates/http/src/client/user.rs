//! User profile endpoint methods

use reqwest::Method;

use super::{AuthenticatedClient, ClientError};
use crate::types::{ChangePasswordRequest, MessageResponse, UpdateNameRequest, UserSnapshot};

impl AuthenticatedClient {
    /// Fetch the session snapshot for the current user.
    ///
    /// An auth failure here means "no session" and propagates as-is; the
    /// session-fetch path sits outside the protected allow-list so that
    /// an anonymous startup probe never spins up a refresh.
    pub async fn current_user(&self) -> Result<UserSnapshot, ClientError> {
        self.execute(Method::GET, "/api/user/getcurrentuser", |req| req)
            .await
    }

    /// Change the display name
    pub async fn update_name(&self, name: &str) -> Result<MessageResponse, ClientError> {
        let body = UpdateNameRequest {
            name: name.to_string(),
        };
        self.execute(Method::PUT, "/api/user/update-name", move |req| {
            req.json(&body)
        })
        .await
    }

    /// Change the password
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let body = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.execute(Method::PUT, "/api/user/change-password", move |req| {
            req.json(&body)
        })
        .await
    }
}
