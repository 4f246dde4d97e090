//! Persisted session token
//!
//! One-shot CLI invocations cannot keep a cookie jar alive between
//! runs, so the access token is persisted as JSON under the user's
//! config directory instead.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    access_token: Option<String>,
}

pub struct SessionFile {
    path: PathBuf,
    stored: StoredSession,
}

impl SessionFile {
    /// Open the session file under the user's config directory
    pub fn open() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "massmail")
            .context("could not determine a config directory")?;
        Ok(Self::at(dirs.config_dir().join("session.json")))
    }

    /// Open a session file at an explicit path
    pub fn at(path: PathBuf) -> Self {
        let stored = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, stored }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Option<&str> {
        self.stored.access_token.as_deref()
    }

    /// Persist a new access token
    pub fn remember(&mut self, token: &str) -> Result<()> {
        self.stored.access_token = Some(token.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.stored)?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Drop the persisted session
    pub fn forget(&mut self) -> Result<()> {
        self.stored = StoredSession::default();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_and_reopen_round_trips_the_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = SessionFile::at(path.clone());
        assert!(session.token().is_none());

        session.remember("tok-1").unwrap();
        let reopened = SessionFile::at(path);
        assert_eq!(reopened.token(), Some("tok-1"));
    }

    #[test]
    fn forget_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = SessionFile::at(path.clone());
        session.remember("tok-1").unwrap();
        session.forget().unwrap();

        assert!(!path.exists());
        assert!(SessionFile::at(path).token().is_none());
    }

    #[test]
    fn corrupt_files_fall_back_to_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        assert!(SessionFile::at(path).token().is_none());
    }
}
