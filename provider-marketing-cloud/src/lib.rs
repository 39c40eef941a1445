//! # Marketing Cloud Provider
//!
//! Implements the `RemoteCatalog` trait for the Marketing Cloud REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Root and child folder listing through the legacy folder API
//! - Paged data extension listing per folder
//! - Retention updates via `PATCH /data/v1/customobjects/{id}`
//! - Bearer auth from a shared credential cache with a single refresh on 401
//!
//! Transient transport failures are retried by the injected `HttpClient`;
//! this crate only classifies what comes back.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::MarketingCloudConnector;
pub use error::{MarketingCloudError, Result};
pub use types::parse_api_time;
