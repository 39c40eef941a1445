//! # Library Module
//!
//! Owns the local mirror of the remote catalog and provides repository
//! patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pool and embedded migrations
//! - Folder hierarchy and data extension rows
//! - Retention settings and their push-back status
//!
//! Writes are idempotent upserts. Constraint failures are classified so the
//! hierarchy resolver can tell "parent not written yet" apart from real
//! errors (see [`LibraryError::ParentMissing`]).

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{DataExtension, Folder, RetentionState, RetentionUpdateStatus};
pub use repositories::{
    DataExtensionRepository, FolderRepository, SqliteDataExtensionRepository,
    SqliteFolderRepository,
};
