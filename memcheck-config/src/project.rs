//! Optional per-project YAML file (`.ruby_memcheck.yml`).
//!
//! Every field is optional; anything left out keeps the builder's default.
//!
//! ```yaml
//! binary_name: mygem
//! suppressions_dir: ext/suppressions
//! skipped_ruby_functions:
//!   - "^rb_funcall"
//!   - "^my_gem_cache_"
//! xml_file: tmp/valgrind.xml
//! ```

use crate::config::{ConfigurationBuilder, ReportSink, StructuredOutput};
use crate::error::ConfigError;
use crate::patterns::FunctionPattern;
use crate::runtime::RuntimeVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_NAME: &str = ".ruby_memcheck.yml";

/// Relative paths in a loaded file are resolved against the file's own
/// directory. `ruby` and `valgrind` are only resolved when they name a path
/// (`bin/ruby`); a bare name is still looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub binary_name: Option<String>,
    pub ruby: Option<PathBuf>,
    /// `<engine>-<version>.<patchlevel>`; skips probing the runtime.
    pub runtime_version: Option<String>,
    pub valgrind: Option<PathBuf>,
    pub valgrind_options: Option<Vec<String>>,
    pub suppressions_dir: Option<PathBuf>,
    pub skipped_ruby_functions: Option<Vec<FunctionPattern>>,
    /// `false` turns off structured output entirely.
    pub xml: Option<bool>,
    pub xml_file: Option<PathBuf>,
    /// `stderr`, `stdout` or a file path.
    pub output: Option<String>,
}

impl ProjectConfig {
    /// Load a project file. A missing file is not an error and yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No project config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        log::info!("Loading project config from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_yaml_ng::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_relative_paths(base);
        Ok(config)
    }

    /// Anchor relative paths at `base`. Bare executable names (`ruby`,
    /// `valgrind`) are command names, not paths, and are left for `PATH`.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let anchor = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        let anchor_command = |p: PathBuf| {
            if p.components().count() > 1 { anchor(p) } else { p }
        };

        self.suppressions_dir = self.suppressions_dir.take().map(anchor);
        self.xml_file = self.xml_file.take().map(anchor);
        self.ruby = self.ruby.take().map(anchor_command);
        self.valgrind = self.valgrind.take().map(anchor_command);

        if let Some(output) = self.output.take() {
            let Ok(sink) = output.parse::<ReportSink>();
            self.output = Some(match sink {
                ReportSink::File(file) if file.is_relative() => {
                    match base.join(&file).into_os_string().into_string() {
                        Ok(resolved) => resolved,
                        Err(_) => {
                            log::debug!("Report path under non UTF-8 {:?} left relative", base);
                            output
                        }
                    }
                }
                _ => output,
            });
        }
    }

    /// Overlay the set fields onto `builder`.
    pub fn apply(self, mut builder: ConfigurationBuilder) -> Result<ConfigurationBuilder, ConfigError> {
        if let Some(name) = self.binary_name {
            builder = builder.binary_name(name);
        }
        if let Some(ruby) = self.ruby {
            builder = builder.ruby(ruby);
        }
        if let Some(version) = self.runtime_version {
            builder = builder.runtime(RuntimeVersion::parse(&version)?);
        }
        if let Some(valgrind) = self.valgrind {
            builder = builder.valgrind(valgrind);
        }
        if let Some(options) = self.valgrind_options {
            builder = builder.valgrind_options(options);
        }
        if let Some(dir) = self.suppressions_dir {
            builder = builder.suppressions_dir(dir);
        }
        if let Some(patterns) = self.skipped_ruby_functions {
            builder = builder.skipped_ruby_functions(patterns);
        }
        match (self.xml, self.xml_file) {
            (Some(false), _) => builder = builder.structured_output(StructuredOutput::Disabled),
            (_, Some(file)) => builder = builder.structured_output(StructuredOutput::File(file)),
            (Some(true), None) => builder = builder.structured_output(StructuredOutput::TempFile),
            (None, None) => {}
        }
        if let Some(output) = self.output {
            let Ok(sink) = output.parse::<ReportSink>();
            builder = builder.output(sink);
        }
        Ok(builder)
    }
}
