//! # Repository Pattern Implementation
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Every write is an idempotent upsert; batch variants run in one transaction
//!
//! ## Available Repositories
//!
//! - `FolderRepository` - Self-referencing folder hierarchy
//! - `DataExtensionRepository` - Data extensions with their retention settings

pub mod data_extension;
pub mod folder;

pub use data_extension::{
    truncate_error, DataExtensionRepository, SqliteDataExtensionRepository, MAX_ERROR_LEN,
};
pub use folder::{FolderRepository, SqliteFolderRepository};
