//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and server hosts.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls, connection pooling and
//!   exponential backoff on transient failures
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use bridge_traits::HttpClient;
//! use std::sync::Arc;
//!
//! let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
