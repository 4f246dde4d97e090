//! HTTP client for the massmail backend
//!
//! Two typed clients cover the API surface: [`PublicClient`] for the
//! auth/session endpoints that never require credentials, and
//! [`AuthenticatedClient`] for everything behind a session. The
//! authenticated client carries the refresh-retry protocol: an auth
//! failure on a protected path triggers exactly one silent token refresh
//! shared by all concurrent callers, then one replay of the original
//! request.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::{AuthenticatedClient, ClientBuilder, PublicClient};
