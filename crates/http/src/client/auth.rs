//! Auth endpoint methods
//!
//! All of these live on [`PublicClient`]: auth paths are outside the
//! protected allow-list, so their failures (bad credentials, unverified
//! accounts) surface directly and never trigger a refresh.

use reqwest::Method;

use super::{ClientError, PublicClient};
use crate::types::{
    AuthResponse, GoogleAuthRequest, LoginRequest, MessageResponse, ResendVerificationRequest,
    SignupRequest,
};

impl PublicClient {
    /// Sign in with email and password
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/login")
            .json(request);
        self.execute(req).await
    }

    /// Create an account
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/signup")
            .json(request);
        self.execute(req).await
    }

    /// Sign in with a Google OAuth credential token
    pub async fn google_login(
        &self,
        request: &GoogleAuthRequest,
    ) -> Result<AuthResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/google")
            .json(request);
        self.execute(req).await
    }

    /// End the current session
    pub async fn logout(&self) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::POST, "/api/auth/logout");
        self.execute(req).await
    }

    /// Confirm an email address with the token from the verification mail
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::GET, "/api/auth/verify-email")
            .query(&[("token", token)]);
        self.execute(req).await
    }

    /// Ask for another verification mail
    pub async fn resend_verification(
        &self,
        request: &ResendVerificationRequest,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/resend-verification")
            .json(request);
        self.execute(req).await
    }
}
