//! # surfdap-core
//!
//! Core types shared by the SurfDAP crates.
//!
//! This crate carries no directory protocol code. It defines the error taxonomy, the
//! configuration consumed when binding a root node, and the search primitives (scope and
//! limits) every directory request is built from.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and stable error codes
//! - [`config`] - Connection configuration, file loading and environment overrides
//! - [`scope`] - Search scope and per-request search limits

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod scope;

// Re-export commonly used types
pub use config::DirectoryConfig;
pub use error::{Error, Result};
pub use scope::{SearchLimits, SearchScope};
