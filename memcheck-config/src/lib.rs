//! Checker configuration for ruby-memcheck.
//!
//! This crate turns user-level settings into a ready-to-run valgrind
//! invocation. It includes:
//!
//! - Default checker flags and ignored Ruby entry points
//! - Runtime version detection and the suppression fallback chain
//! - Glob-based suppression-file discovery
//! - The immutable [`Configuration`] and its builder
//! - Optional YAML project file loading

pub mod config;
pub mod defaults;
pub mod error;
pub mod patterns;
pub mod project;
pub mod runtime;
pub mod suppressions;

pub use config::{Configuration, ConfigurationBuilder, ReportSink, StructuredOutput};
pub use error::ConfigError;
pub use patterns::{FunctionPattern, compile_patterns};
pub use project::ProjectConfig;
pub use runtime::{RuntimeProbe, RuntimeVersion};
pub use suppressions::{resolve_suppression_files, select_suppression_files};
