//! URL handling module for Datasheet-Mirror
//!
//! This module provides datasheet URL resolution, host pattern matching for
//! the trusted and viewer host lists, and destination naming.

mod hosts;
mod naming;
mod resolve;

// Re-export main types and functions
pub use hosts::{matches_wildcard, HostList};
pub use naming::{artifact_file_name, mirror_location, sanitize_identifier};
pub use resolve::{ResolvedTarget, UrlResolver};
