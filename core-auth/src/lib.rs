//! # Authentication Module
//!
//! Bearer credential handling for the remote marketing platform.
//!
//! ## Overview
//!
//! A single [`CredentialCache`] owns the current credential for one sync
//! process and hands it to every caller. When the credential is missing or
//! within 30 seconds of expiry the cache asks its [`Authenticator`] for a new
//! one. [`ClientCredentialsAuthenticator`] implements the OAuth 2.0
//! client-credentials grant used in production.
//!
//! ## Features
//!
//! - Shared, injectable cache (no process-wide state)
//! - Lock-free network path: concurrent refreshers may race, last writer wins
//! - Injectable [`Clock`](bridge_traits::time::Clock) for deterministic expiry tests

pub mod client_credentials;
pub mod credential_cache;
pub mod error;
pub mod types;

pub use client_credentials::ClientCredentialsAuthenticator;
pub use credential_cache::{Authenticator, CredentialCache};
pub use error::{AuthError, Result};
pub use types::{AccessGrant, Credential};
