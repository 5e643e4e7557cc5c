//! # pkgmeta Common Library
//!
//! Shared code for the pkgmeta crates including:
//! - Upstream package record model
//! - Configuration loading (provider tables, strategy overrides, thresholds)
//! - Dotted-path value utilities
//! - Text similarity
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod logging;
pub mod package;
pub mod text;
pub mod value_path;

pub use error::{Error, Result};
pub use package::PackageRecord;
