//! Default values for checker configuration.
//!
//! Free functions so they can double as `#[serde(default = "...")]` targets
//! and builder fallbacks.

use crate::patterns::FunctionPattern;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

// ── Checker ────────────────────────────────────────────────────────────────

pub const VALGRIND: &str = "valgrind";

/// Base flags passed to valgrind before any suppression flags.
pub const VALGRIND_OPTIONS: &[&str] = &[
    "--num-callers=50",
    "--error-limit=no",
    "--undef-value-errors=no",
    "--leak-check=full",
    "--show-leak-kinds=definite",
];

pub const SUPPRESSIONS_DIR: &str = "suppressions";

pub fn valgrind() -> PathBuf {
    PathBuf::from(VALGRIND)
}

pub fn valgrind_options() -> Vec<String> {
    VALGRIND_OPTIONS.iter().map(|s| s.to_string()).collect()
}

pub fn suppressions_dir() -> PathBuf {
    PathBuf::from(SUPPRESSIONS_DIR)
}

// ── Runtime ────────────────────────────────────────────────────────────────

pub const RUBY: &str = "ruby";

pub fn ruby() -> PathBuf {
    PathBuf::from(RUBY)
}

/// First executable `name` found in the absolute directories of
/// `search_path` (a `PATH`-style list). Relative entries are skipped so the
/// result is always absolute.
pub fn find_executable(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    let file_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    std::env::split_paths(search_path)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(&file_name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Classifier ─────────────────────────────────────────────────────────────

/// Ruby C-API entry points that allocate on purpose (interned symbols,
/// exception objects, method caches). An error whose innermost Ruby frame is
/// one of these, before the extension is ever entered, is not the
/// extension's fault.
pub const SKIPPED_RUBY_FUNCTIONS: &[&str] = &[
    "^rb_check_funcall",
    "^rb_enc_raise$",
    "^rb_exc_raise$",
    "^rb_funcall",
    "^rb_intern",
    "^rb_ivar_set$",
    "^rb_raise$",
    "^rb_rescue",
    "^rb_respond_to$",
    "^rb_yield",
];

pub fn skipped_ruby_functions() -> Vec<FunctionPattern> {
    SKIPPED_RUBY_FUNCTIONS
        .iter()
        .filter_map(|p| FunctionPattern::new(p).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_pattern_compiles() {
        assert_eq!(
            skipped_ruby_functions().len(),
            SKIPPED_RUBY_FUNCTIONS.len()
        );
    }

    #[cfg(unix)]
    fn write_executable(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_first_match_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_executable(&first.path().join("ruby"), 0o755);
        write_executable(&second.path().join("ruby"), 0o755);

        let search = std::env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(
            find_executable("ruby", &search),
            Some(first.path().join("ruby"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_skips_non_executables_and_dirs() {
        let plain = tempfile::tempdir().unwrap();
        let nested = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        write_executable(&plain.path().join("ruby"), 0o644);
        std::fs::create_dir(nested.path().join("ruby")).unwrap();
        write_executable(&bin.path().join("ruby"), 0o755);

        let search = std::env::join_paths([plain.path(), nested.path(), bin.path()]).unwrap();
        assert_eq!(find_executable("ruby", &search), Some(bin.path().join("ruby")));
    }

    #[test]
    fn test_find_executable_ignores_relative_entries() {
        let search = std::env::join_paths(["bin", "."]).unwrap();
        assert_eq!(find_executable("ruby", &search), None);
    }

    #[test]
    fn test_default_options_order() {
        let opts = valgrind_options();
        assert_eq!(opts.first().map(String::as_str), Some("--num-callers=50"));
        assert_eq!(
            opts.last().map(String::as_str),
            Some("--show-leak-kinds=definite")
        );
    }
}
