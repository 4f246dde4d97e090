//! Shared domain types and client-side state for massmail.
//!
//! This crate holds everything the HTTP client and the CLI have in common:
//! the wire-level domain types, the session snapshot store, configuration
//! loading, and CSV parse-and-preview with placeholder substitution.

pub mod config;
pub mod csv;
pub mod error;
pub mod session;
pub mod types;

pub use config::ClientConfig;
pub use error::{CoreError, CoreResult};
pub use session::{SessionState, SessionStore};
