//! Suppression-file discovery.
//!
//! Suppression files are named `<binary>_<version-id>.supp` where the version
//! id walks the runtime's fallback chain. Names are matched as shell globs so
//! a project can ship e.g. `mygem_ruby-3.*.supp`. Every match across the whole
//! chain is loaded, most specific first.

use crate::runtime::RuntimeVersion;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SUPPRESSION_EXTENSION: &str = "supp";

/// Translate a shell glob over a single file name into an anchored regex.
///
/// Supports `*`, `?`, `[abc]`, `[a-z]` and negated `[!abc]` / `[^abc]`
/// classes. Wildcards never match a path separator. An unterminated `[` is
/// treated as a literal.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                // `[]` / `[!]` take the first `]` as a member, as sh does
                Some(_) => {
                    let mut j = i + 1;
                    let mut class = String::from("[");
                    if matches!(chars.get(j), Some('!') | Some('^')) {
                        class.push('^');
                        j += 1;
                    }
                    let body_start = j;
                    while j < chars.len() && (chars[j] != ']' || j == body_start) {
                        let c = chars[j];
                        if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
                            class.push('\\');
                        }
                        class.push(c);
                        j += 1;
                    }
                    if j >= chars.len() {
                        out.push_str(&regex::escape("["));
                    } else {
                        class.push(']');
                        out.push_str(&class);
                        i = j;
                    }
                }
                None => out.push_str(&regex::escape("[")),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Glob for the suppression file of `binary_name` at one chain entry.
pub fn suppression_glob(binary_name: &str, version_id: &str) -> String {
    format!("{binary_name}_{version_id}.{SUPPRESSION_EXTENSION}")
}

/// Select suppression file names from a directory listing.
///
/// Pure over its inputs: for each chain entry in order, the names matching
/// that entry's glob are taken in sorted order. A name matched by several
/// entries is kept only at its first (most specific) position.
pub fn select_suppression_files<S: AsRef<str>>(
    file_names: &[S],
    binary_name: &str,
    chain: &[String],
) -> Vec<String> {
    let mut sorted: Vec<&str> = file_names.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for version_id in chain {
        let glob = suppression_glob(binary_name, version_id);
        let re = match Regex::new(&glob_to_regex(&glob)) {
            Ok(re) => re,
            Err(e) => {
                log::warn!("Skipping unusable suppression glob '{glob}': {e}");
                continue;
            }
        };

        for name in sorted.iter().filter(|name| re.is_match(name)) {
            if seen.insert(*name) {
                selected.push((*name).to_string());
            }
        }
    }

    selected
}

/// Find every suppression file in `dir` that applies to `binary_name` on `runtime`.
///
/// A missing or unreadable directory yields no files.
pub fn resolve_suppression_files(
    dir: &Path,
    binary_name: &str,
    runtime: &RuntimeVersion,
) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No suppressions loaded from {:?}: {e}", dir);
            return Vec::new();
        }
    };

    let file_names: Vec<String> = entries
        .filter_map(Result::ok)
        // Follows symlinks; dangling links and links to directories are dropped
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();

    let chain = runtime.fallback_chain();
    let files: Vec<PathBuf> = select_suppression_files(&file_names, binary_name, &chain)
        .into_iter()
        .map(|name| dir.join(name))
        .collect();

    log::info!(
        "Resolved {} suppression file(s) for {} on {} from {:?}",
        files.len(),
        binary_name,
        runtime,
        dir
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(glob: &str, name: &str) -> bool {
        Regex::new(&glob_to_regex(glob)).unwrap().is_match(name)
    }

    fn chain(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_glob_literal() {
        assert!(matches("mygem_ruby-3.3.supp", "mygem_ruby-3.3.supp"));
        assert!(!matches("mygem_ruby-3.3.supp", "mygem_ruby-3x3.supp"));
        assert!(!matches("mygem_ruby.supp", "mygem_ruby.supp.bak"));
    }

    #[test]
    fn test_glob_star_and_question() {
        assert!(matches("mygem_*.supp", "mygem_ruby-3.3.0.supp"));
        assert!(matches("mygem_ruby-3.?.supp", "mygem_ruby-3.1.supp"));
        assert!(!matches("mygem_ruby-3.?.supp", "mygem_ruby-3.10.supp"));
        assert!(!matches("*.supp", "dir/x.supp"));
    }

    #[test]
    fn test_glob_classes() {
        assert!(matches("v[0-9].supp", "v7.supp"));
        assert!(!matches("v[!0-9].supp", "v7.supp"));
        assert!(matches("v[!0-9].supp", "vx.supp"));
        assert!(matches("v[]a].supp", "v].supp"));
        assert!(matches("v[]a].supp", "va.supp"));
    }

    #[test]
    fn test_glob_unterminated_class_is_literal() {
        assert!(matches("a[b", "a[b"));
        assert!(!matches("a[b", "ab"));
    }

    #[test]
    fn test_select_follows_chain_order_without_short_circuit() {
        let names = [
            "mygem_X.supp",
            "mygem_X-2.1.supp",
            "mygem_X-2.1.5.3.supp",
            "unrelated.supp",
            "othergem_X.supp",
        ];
        let selected = select_suppression_files(
            &names,
            "mygem",
            &chain(&["X-2.1.5.3", "X-2.1.5", "X-2.1", "X-2", "X"]),
        );
        assert_eq!(
            selected,
            vec!["mygem_X-2.1.5.3.supp", "mygem_X-2.1.supp", "mygem_X.supp"]
        );
    }

    #[test]
    fn test_select_empty_listing() {
        let names: [&str; 0] = [];
        assert!(select_suppression_files(&names, "mygem", &chain(&["ruby"])).is_empty());
    }

    #[test]
    fn test_select_wildcard_entry_sorted_and_deduplicated() {
        let names = ["g_ruby-b.supp", "g_ruby-a.supp"];
        let selected = select_suppression_files(&names, "g", &chain(&["ruby-*", "ruby-a"]));
        assert_eq!(selected, vec!["g_ruby-a.supp", "g_ruby-b.supp"]);
    }

    #[test]
    fn test_resolve_missing_directory() {
        let runtime = RuntimeVersion::new("ruby", "3.3.0", 0);
        let files = resolve_suppression_files(
            Path::new("/nonexistent/ruby-memcheck/suppressions"),
            "mygem",
            &runtime,
        );
        assert!(files.is_empty());
    }

    #[test]
    fn test_resolve_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["mygem_ruby.supp", "mygem_ruby-3.3.supp", "mygem_ruby-2.7.supp"] {
            std::fs::write(dir.path().join(name), "{\n}\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("mygem_ruby-3.supp")).unwrap();

        let runtime = RuntimeVersion::new("ruby", "3.3.0", 0);
        let files = resolve_suppression_files(dir.path(), "mygem", &runtime);
        assert_eq!(
            files,
            vec![
                dir.path().join("mygem_ruby-3.3.supp"),
                dir.path().join("mygem_ruby.supp"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        std::fs::write(shared.path().join("common.supp"), "{\n}\n").unwrap();
        std::fs::create_dir(shared.path().join("nested")).unwrap();

        symlink(shared.path().join("common.supp"), dir.path().join("mygem_ruby-3.3.0.supp")).unwrap();
        symlink(shared.path().join("nested"), dir.path().join("mygem_ruby-3.3.supp")).unwrap();
        symlink(shared.path().join("missing.supp"), dir.path().join("mygem_ruby.supp")).unwrap();

        let runtime = RuntimeVersion::new("ruby", "3.3.0", 0);
        let files = resolve_suppression_files(dir.path(), "mygem", &runtime);
        assert_eq!(files, vec![dir.path().join("mygem_ruby-3.3.0.supp")]);
    }
}
