//! Typed error variants for the memcheck-config crate.
//!
//! Configuration is built once per run, so every failure here is fatal for
//! that run. Missing suppression directories are deliberately NOT errors and
//! never show up in this enum.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a [`crate::Configuration`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No binary name was given (or it was empty).
    #[error("binary name is required to configure the checker")]
    MissingBinaryName,

    /// A runtime version string did not have the `<engine>-<version>.<patchlevel>` shape.
    #[error("invalid runtime version '{0}': expected <engine>-<major.minor.patch>.<patchlevel>")]
    InvalidRuntimeVersion(String),

    /// An ignore pattern was not a valid regular expression.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern text as written.
        pattern: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// Interrogating the runtime executable for its version failed.
    #[error("failed to probe runtime '{}': {reason}", .runtime.display())]
    RuntimeProbe {
        /// Runtime executable that was invoked.
        runtime: PathBuf,
        /// Human-readable reason (spawn failure, bad exit, unparsable output).
        reason: String,
    },

    /// The scoped temp file for structured output could not be created.
    #[error("failed to create structured output file: {0}")]
    TempFile(#[source] std::io::Error),

    /// The YAML project file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        /// Path of the project file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML project file could not be parsed.
    #[error("YAML parse error in '{}': {source}", .path.display())]
    Parse {
        /// Path of the project file.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml_ng::Error,
    },
}
