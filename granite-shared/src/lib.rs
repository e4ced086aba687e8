//! # Granite Flow Shared Library
//!
//! Domain logic for the Granite Flow dashboard: RBAC, the task workflow and
//! the auth flow, all running against a remote backend-as-a-service that owns
//! persistence, identity and row-level permissions.
//!
//! ## Module Organization
//!
//! - `gateway`: Remote data/auth gateway trait, HTTP and in-memory backends
//! - `client`: Session-scoped client with typed table access
//! - `models`: Rows and payloads mirrored from the gateway's tables
//! - `auth`: Session cache, role resolver, access gate, auth flow, retry
//! - `tasks`: Task workflow and list presentation helpers

pub mod auth;
pub mod client;
pub mod gateway;
pub mod models;
pub mod tasks;

/// Current version of the Granite Flow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
