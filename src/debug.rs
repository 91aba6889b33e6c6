//! Log bridge for ruby-memcheck.
//!
//! Routes every `log::info!()` etc. to a debug log file so that checker
//! output on stderr stays readable:
//!
//! - `/tmp/ruby_memcheck_debug.log` on Unix/macOS
//! - `%TEMP%\ruby_memcheck_debug.log` on Windows
//!
//! When `RUST_LOG` is set, records are mirrored to stderr as well. The
//! `--log-level` CLI flag takes precedence over `RUST_LOG`; with neither set
//! only warnings and errors are recorded.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_FILE_NAME: &str = "ruby_memcheck_debug.log";

pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp").join(LOG_FILE_NAME)
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join(LOG_FILE_NAME)
    }
}

struct LogBridge {
    file: Option<Mutex<File>>,
    mirror_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        if let Some(file) = &self.file {
            // A full disk must not take the checker run down with it
            let _ = file.lock().write_all(line.as_bytes());
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Resolve the effective level: CLI override, then `RUST_LOG`, then `Warn`.
pub fn effective_level(cli_level: Option<log::LevelFilter>) -> log::LevelFilter {
    cli_level
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.trim().parse::<log::LevelFilter>().ok())
        })
        .unwrap_or(log::LevelFilter::Warn)
}

/// Install the log bridge. Calling it again only updates the level.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let level = effective_level(cli_level);

    let bridge = BRIDGE.get_or_init(|| {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
            .ok()
            .map(Mutex::new);
        LogBridge {
            file,
            mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
        }
    });

    // Already set by an earlier call (or by a test harness logger)
    let _ = log::set_logger(bridge);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_level_wins() {
        assert_eq!(
            effective_level(Some(log::LevelFilter::Trace)),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_log_path_file_name() {
        assert_eq!(
            log_path().file_name().and_then(|n| n.to_str()),
            Some(LOG_FILE_NAME)
        );
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        let (secs, micros) = ts.split_once('.').unwrap();
        assert!(secs.parse::<u64>().is_ok());
        assert_eq!(micros.len(), 6);
    }
}
