//! Request and response bodies for the massmail backend API

use serde::{Deserialize, Serialize};

pub use massmail_core::types::{CsvFileRef, LogStatus, MailLogEntry, Template, UserSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Google sign-in: the OAuth credential token issued to the configured
/// client id
#[derive(Debug, Clone, Serialize)]
pub struct GoogleAuthRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserSnapshot>,
}

/// Generic `{message}` acknowledgement body
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDraft {
    pub name: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMassRequest {
    pub csv_file_id: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMassResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<SendResults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendResults {
    pub successful: u64,
    pub total: u64,
}

/// Query parameters for the paginated log endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LogQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LogStatus>,
    /// Inclusive lower bound, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            from: None,
            to: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailLogsPage {
    #[serde(default)]
    pub logs: Vec<MailLogEntry>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u64,
}
