//! Retention sync workspace crate.
//!
//! Re-exports the service façade and the report types so hosts can drive a
//! sync without wiring the individual workspace crates.

pub use core_runtime::config::{AppConfig, MarketingCloudConfig, SyncTuning};
pub use core_service::{bootstrap, CoreDependencies, CoreError, CoreService};
pub use core_sync::{ReconcileReport, SyncMetricsSnapshot, SyncReport};
