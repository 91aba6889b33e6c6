//! Ruby runtime identification.
//!
//! The runtime version drives two things: which suppression files apply
//! (via [`RuntimeVersion::fallback_chain`]) and how a `libruby.so` frame is
//! recognised when Ruby was built with `--enable-shared`.

use crate::error::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Ruby script printing engine, version, patchlevel and interpreter path,
/// one per line.
const PROBE_SCRIPT: &str = "require 'rbconfig'; puts RUBY_ENGINE, RUBY_VERSION, RUBY_PATCHLEVEL, RbConfig.ruby";

/// Engine, version and patchlevel of a Ruby interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion {
    /// `RUBY_ENGINE`, e.g. `ruby` or `truffleruby`.
    pub engine: String,
    /// `RUBY_VERSION`, e.g. `3.3.0`.
    pub version: String,
    /// `RUBY_PATCHLEVEL`; `-1` on development builds.
    pub patchlevel: i64,
}

/// Result of probing an interpreter: its version plus the absolute path of
/// the executable that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProbe {
    pub version: RuntimeVersion,
    pub executable: PathBuf,
}

impl RuntimeVersion {
    pub fn new(engine: impl Into<String>, version: impl Into<String>, patchlevel: i64) -> Self {
        Self {
            engine: engine.into(),
            version: version.into(),
            patchlevel,
        }
    }

    /// Parse `<engine>-<major.minor.patch>.<patchlevel>`.
    ///
    /// The patchlevel is the last dot-separated component, so
    /// `ruby-3.4.0.-1` parses as patchlevel `-1`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRuntimeVersion(s.to_string());

        let (engine, rest) = s.split_once('-').ok_or_else(invalid)?;
        let (version, patchlevel) = rest.rsplit_once('.').ok_or_else(invalid)?;
        if engine.is_empty() || version.is_empty() {
            return Err(invalid());
        }
        let patchlevel = patchlevel.parse::<i64>().map_err(|_| invalid())?;

        Ok(Self::new(engine, version, patchlevel))
    }

    /// `<engine>-<version>.<patchlevel>`, e.g. `ruby-3.3.0.0`.
    pub fn full_version(&self) -> String {
        format!("{}-{}.{}", self.engine, self.version, self.patchlevel)
    }

    /// Version identifiers from most to least specific.
    ///
    /// `ruby-3.3.0.0` yields `ruby-3.3.0.0, ruby-3.3.0, ruby-3.3, ruby-3, ruby`.
    /// Truncating to zero components is the bare engine, so it is folded into
    /// the trailing engine entry rather than producing an empty identifier.
    pub fn fallback_chain(&self) -> Vec<String> {
        let full = self.full_version();
        let parts: Vec<&str> = full.split('.').collect();

        let mut chain = vec![full.clone()];
        for i in (1..=3).rev() {
            let take = i.min(parts.len());
            chain.push(parts[..take].join("."));
        }
        chain.push(self.engine.clone());

        let mut seen = std::collections::HashSet::new();
        chain.retain(|entry| !entry.is_empty() && seen.insert(entry.clone()));
        chain
    }

    /// File name of the shared library for a `--enable-shared` build.
    pub fn shared_library_name(&self) -> String {
        format!("libruby.so.{}", self.version)
    }

    /// Ask `ruby` for its version and real executable path.
    pub fn probe(ruby: &Path) -> Result<RuntimeProbe, ConfigError> {
        let probe_err = |reason: String| ConfigError::RuntimeProbe {
            runtime: ruby.to_path_buf(),
            reason,
        };

        log::debug!("Probing runtime version with {:?}", ruby);
        let output = Command::new(ruby)
            .arg("-e")
            .arg(PROBE_SCRIPT)
            .output()
            .map_err(|e| probe_err(e.to_string()))?;

        if !output.status.success() {
            return Err(probe_err(format!("exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let probe = parse_probe_output(&stdout).ok_or_else(|| {
            probe_err(format!("unexpected output: {:?}", stdout.trim()))
        })?;
        log::info!(
            "Detected runtime {} at {:?}",
            probe.version.full_version(),
            probe.executable
        );
        Ok(probe)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_version())
    }
}

fn parse_probe_output(stdout: &str) -> Option<RuntimeProbe> {
    let mut lines = stdout.lines().map(str::trim);
    let engine = lines.next().filter(|s| !s.is_empty())?;
    let version = lines.next().filter(|s| !s.is_empty())?;
    let patchlevel = lines.next()?.parse::<i64>().ok()?;
    let executable = lines.next().filter(|s| !s.is_empty())?;

    Some(RuntimeProbe {
        version: RuntimeVersion::new(engine, version, patchlevel),
        executable: PathBuf::from(executable),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_version() {
        let v = RuntimeVersion::new("ruby", "3.3.0", 0);
        assert_eq!(v.full_version(), "ruby-3.3.0.0");
    }

    #[test]
    fn test_fallback_chain_order() {
        let v = RuntimeVersion::new("X", "2.1.5", 3);
        assert_eq!(
            v.fallback_chain(),
            vec!["X-2.1.5.3", "X-2.1.5", "X-2.1", "X-2", "X"]
        );
    }

    #[test]
    fn test_fallback_chain_dev_build() {
        let v = RuntimeVersion::new("ruby", "3.4.0", -1);
        assert_eq!(
            v.fallback_chain(),
            vec!["ruby-3.4.0.-1", "ruby-3.4.0", "ruby-3.4", "ruby-3", "ruby"]
        );
    }

    #[test]
    fn test_fallback_chain_short_version_has_no_duplicates() {
        let v = RuntimeVersion::new("ruby", "3", 0);
        assert_eq!(v.fallback_chain(), vec!["ruby-3.0", "ruby-3", "ruby"]);
    }

    #[test]
    fn test_parse_round_trip() {
        let v = RuntimeVersion::parse("truffleruby-23.1.2.0").unwrap();
        assert_eq!(v.engine, "truffleruby");
        assert_eq!(v.version, "23.1.2");
        assert_eq!(v.patchlevel, 0);
    }

    #[test]
    fn test_parse_negative_patchlevel() {
        let v = RuntimeVersion::parse("ruby-3.4.0.-1").unwrap();
        assert_eq!(v.patchlevel, -1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["ruby", "ruby-", "ruby-3", "-3.3.0.0", "ruby-3.3.0.x"] {
            assert!(
                matches!(
                    RuntimeVersion::parse(bad),
                    Err(ConfigError::InvalidRuntimeVersion(_))
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_shared_library_name() {
        let v = RuntimeVersion::new("ruby", "3.2.2", 53);
        assert_eq!(v.shared_library_name(), "libruby.so.3.2.2");
    }

    #[test]
    fn test_parse_probe_output() {
        let probe = parse_probe_output("ruby\n3.3.0\n0\n/usr/local/bin/ruby\n").unwrap();
        assert_eq!(probe.version, RuntimeVersion::new("ruby", "3.3.0", 0));
        assert_eq!(probe.executable, PathBuf::from("/usr/local/bin/ruby"));
    }

    #[test]
    fn test_parse_probe_output_truncated() {
        assert!(parse_probe_output("ruby\n3.3.0\n").is_none());
        assert!(parse_probe_output("ruby\n3.3.0\np0\n/usr/bin/ruby\n").is_none());
    }

    #[test]
    fn test_probe_missing_executable() {
        let err = RuntimeVersion::probe(Path::new("/nonexistent/ruby-memcheck-test/ruby"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::RuntimeProbe { .. }));
    }
}
