// Library exports for the CLI and integration tests
//
// The configuration resolver lives in the `memcheck-config` crate and is
// re-exported as `config`. This crate adds the stack classifier and the
// pieces around it: the stack model handed over by the report parser, the
// report renderer, the checker runner and the log bridge.

pub mod classifier;
pub mod cli;
pub mod debug;
pub mod report;
pub mod runner;
pub mod stack;

pub use memcheck_config as config;

pub use classifier::{Provenance, StackClassifier};
pub use memcheck_config::{Configuration, ConfigurationBuilder};
pub use report::{ReportSummary, render_errors, write_report};
pub use runner::{RunError, run_checker};
pub use stack::{Frame, ReportedError, Stack};
