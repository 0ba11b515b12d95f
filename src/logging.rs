//! Tracing setup.
//!
//! The TUI owns the terminal, so interactive sessions log to a per-launch file
//! in the logs dir. Text and JSON modes log to stderr. `RUST_LOG` overrides
//! the default `star_resume=info` filter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "star-resume";
const MAX_LOG_FILES: usize = 10;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("star_resume=info"))
}

/// Install the global subscriber. Once one is installed, for either target,
/// later calls return `Ok(None)` without touching it.
pub fn init(target: LogTarget) -> Result<Option<PathBuf>, LoggingError> {
    if INSTALLED.load(Ordering::Acquire) {
        return Ok(None);
    }

    match target {
        LogTarget::Stderr => {
            let subscriber = Registry::default()
                .with(build_env_filter())
                .with(fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)?;
            INSTALLED.store(true, Ordering::Release);
            Ok(None)
        }
        LogTarget::File => {
            let dir = crate::storage::logs_dir().ok_or(LoggingError::NoDataDir)?;
            std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            prune_old_logs(&dir, MAX_LOG_FILES);

            let file_name = format!("{LOG_FILE_PREFIX}-{}.log", crate::storage::file_timestamp());
            let appender = tracing_appender::rolling::never(&dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let subscriber = Registry::default()
                .with(build_env_filter())
                .with(fmt::layer().with_ansi(false).with_writer(writer));
            tracing::subscriber::set_global_default(subscriber)?;
            INSTALLED.store(true, Ordering::Release);
            let _ = LOG_GUARD.set(guard);

            let path = dir.join(file_name);
            tracing::info!("Logging initialized; log file at {}", path.display());
            Ok(Some(path))
        }
    }
}

/// Keep at most `keep - 1` older log files so the new one fits the budget.
fn prune_old_logs(dir: &std::path::Path, keep: usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut logs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
        })
        .collect();
    if logs.len() < keep {
        return;
    }
    // Timestamped names sort chronologically.
    logs.sort();
    let excess = logs.len() + 1 - keep;
    for path in logs.into_iter().take(excess) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("star-resume-2024010{i}T000000Z.log")), "").unwrap();
        }
        std::fs::write(dir.path().join("other.txt"), "").unwrap();

        prune_old_logs(dir.path(), 3);

        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "other.txt",
                "star-resume-20240103T000000Z.log",
                "star-resume-20240104T000000Z.log",
            ]
        );
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        init(LogTarget::Stderr).unwrap();
        assert!(matches!(init(LogTarget::Stderr), Ok(None)));
        // Already installed, so the file target neither creates a log nor fails.
        assert!(matches!(init(LogTarget::File), Ok(None)));
    }
}
