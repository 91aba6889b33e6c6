//! Shared integration test helpers for ruby-memcheck.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{config_with_suppressions, gem_frame, ruby_frame};
//! ```
//!
//! The `#[allow(dead_code)]` below suppresses warnings when only a subset
//! of helpers is used per file.

#![allow(dead_code)]

use ruby_memcheck::config::{Configuration, RuntimeVersion, StructuredOutput};
use ruby_memcheck::{Frame, Stack};
use std::fs;
use tempfile::TempDir;

pub const BINARY: &str = "mygem";
pub const RUBY: &str = "/usr/local/bin/ruby";
pub const GEM_OBJ: &str = "/app/lib/mygem/mygem.so";

pub fn runtime() -> RuntimeVersion {
    RuntimeVersion::new("ruby", "3.3.0", 0)
}

/// Configuration with no suppressions, no XML output and a fixed runtime.
pub fn plain_config() -> Configuration {
    Configuration::builder(BINARY)
        .ruby(RUBY)
        .runtime(runtime())
        .suppressions_dir("/nonexistent/ruby-memcheck/suppressions")
        .structured_output(StructuredOutput::Disabled)
        .build()
        .expect("plain test configuration must build")
}

/// Creates a temp suppressions directory holding empty files named `names`.
///
/// The `TempDir` must be kept alive until the configuration is built.
pub fn suppressions_dir(names: &[&str]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for name in names {
        fs::write(dir.path().join(name), "{\n   <insert_a_suppression_name_here>\n}\n")
            .expect("Failed to write suppression file");
    }
    dir
}

/// Configuration resolving suppressions from a fresh temp dir of `names`.
pub fn config_with_suppressions(names: &[&str], runtime: RuntimeVersion) -> (Configuration, TempDir) {
    let dir = suppressions_dir(names);
    let config = Configuration::builder(BINARY)
        .ruby(RUBY)
        .runtime(runtime)
        .suppressions_dir(dir.path())
        .structured_output(StructuredOutput::Disabled)
        .build()
        .expect("test configuration must build");
    (config, dir)
}

pub fn ruby_frame(function: &str) -> Frame {
    Frame::new(function).with_obj(RUBY)
}

pub fn gem_frame(function: &str) -> Frame {
    Frame::new(function).with_obj(GEM_OBJ)
}

pub fn foreign_frame(function: &str) -> Frame {
    Frame::new(function).with_obj("/usr/lib/x86_64-linux-gnu/libssl.so.3")
}

pub fn stack(frames: &[Frame]) -> Stack {
    Stack::new(frames.to_vec())
}
