//! Wire-level domain types shared by the HTTP client and the CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user's profile together with the resources the
/// backend keeps per account: saved templates and uploaded CSV files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub files: Vec<CsvFileRef>,
}

/// A saved mail template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
}

/// Reference to an uploaded CSV file stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvFileRef {
    pub file_id: String,
    pub file_name: String,
    pub file_url: String,
}

/// One entry from the mail dispatch log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailLogEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dispatch outcome recorded per recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failed,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
