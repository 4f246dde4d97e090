//! Client-side session snapshot store
//!
//! Holds the current user's snapshot behind an [`ArcSwap`] so the HTTP
//! client and command handlers can read it lock-free while auth events
//! replace it wholesale.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::types::{CsvFileRef, Template, UserSnapshot};

/// Lifecycle of the session snapshot.
///
/// `Unknown` means no session check has happened yet, `Anonymous` means a
/// check happened and there is no user, `Authenticated` carries the
/// current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unknown,
    Anonymous,
    Authenticated(UserSnapshot),
}

impl SessionState {
    /// The current user, if authenticated
    pub fn user(&self) -> Option<&UserSnapshot> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Process-wide session store
#[derive(Debug)]
pub struct SessionStore {
    state: ArcSwap<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a store in the unchecked state
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(SessionState::Unknown),
        }
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.load_full()
    }

    /// The current user, if authenticated
    pub fn user(&self) -> Option<UserSnapshot> {
        self.snapshot().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&**self.state.load(), SessionState::Authenticated(_))
    }

    /// True once a session check has settled on "no user"
    pub fn is_signed_out(&self) -> bool {
        matches!(&**self.state.load(), SessionState::Anonymous)
    }

    /// Replace the snapshot with a fresh user
    pub fn set_user(&self, user: UserSnapshot) {
        debug!(email = %user.email, "session snapshot replaced");
        self.state
            .store(Arc::new(SessionState::Authenticated(user)));
    }

    /// Clear the session, returning whether a user had been present
    pub fn clear(&self) -> bool {
        let previous = self.state.swap(Arc::new(SessionState::Anonymous));
        let was_authenticated = matches!(&*previous, SessionState::Authenticated(_));
        if was_authenticated {
            debug!("session snapshot cleared");
        }
        was_authenticated
    }

    /// Add a template to the snapshot, replacing any existing one with
    /// the same id
    pub fn upsert_template(&self, template: Template) {
        self.update_user(|user| {
            match user.templates.iter_mut().find(|t| t.id == template.id) {
                Some(existing) => *existing = template.clone(),
                None => user.templates.push(template.clone()),
            }
        });
    }

    pub fn remove_template(&self, template_id: &str) {
        self.update_user(|user| user.templates.retain(|t| t.id != template_id));
    }

    pub fn add_file(&self, file: CsvFileRef) {
        self.update_user(|user| {
            if !user.files.iter().any(|f| f.file_id == file.file_id) {
                user.files.push(file.clone());
            }
        });
    }

    pub fn remove_file(&self, file_id: &str) {
        self.update_user(|user| user.files.retain(|f| f.file_id != file_id));
    }

    /// Apply a mutation to the user snapshot, if one is present.
    ///
    /// The closure may run more than once under contention, so it must be
    /// a pure function of its input.
    fn update_user<F>(&self, mutate: F)
    where
        F: Fn(&mut UserSnapshot),
    {
        self.state.rcu(|current| match &**current {
            SessionState::Authenticated(user) => {
                let mut user = user.clone();
                mutate(&mut user);
                Arc::new(SessionState::Authenticated(user))
            }
            other => Arc::new(other.clone()),
        });
    }
}
