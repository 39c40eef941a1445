//! # Host Bridge Traits
//!
//! Abstraction traits for the capabilities the sync core consumes but does
//! not own.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry policy
//! - [`RemoteCatalog`](catalog::RemoteCatalog) - Folder / data extension catalog of the remote system
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their own failures into it, keeping client-side rejections
//! distinguishable through [`BridgeError::is_permanent`].
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so implementations can be shared across
//! spawned tasks behind an `Arc`.

pub mod catalog;
pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use catalog::{
    is_root_parent, RemoteCatalog, RemoteDataExtension, RemoteFolder, RetentionProperties,
    RetentionUnit,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{Clock, LogLevel, SystemClock};
