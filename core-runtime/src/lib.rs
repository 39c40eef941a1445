//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the retention sync core:
//! - Logging and tracing infrastructure
//! - Configuration management (remote credentials, storage, tuning knobs)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other crate leans on. It
//! fixes the logging conventions and the fail-fast configuration rules used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, AppConfigBuilder, MarketingCloudConfig, SyncTuning};
pub use error::{Error, Result};
