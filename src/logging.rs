//! Tracing subscriber setup.
//!
//! Human-readable or JSON lines on stderr, plus an optional daily-rotated
//! file. `RUST_LOG` overrides the configured level.

use crate::config::LoggingConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "agentlink.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process. `None` when file logging is off.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, std::io::Error> {
    let (subscriber, guard) = build(config)?;
    // try_init: a subscriber may already be installed (tests, embedding apps)
    if let Err(e) = subscriber.try_init() {
        eprintln!("agentlink: logging already initialised: {e}");
    }
    Ok(guard)
}

fn build(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_writer, guard) = match &config.file {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });
    let (json_layer, plain_layer) = if config.json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(json_layer)
        .with(plain_layer);
    Ok((subscriber, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layer_writes_into_created_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_dir = dir.path().join("logs");
        let config = LoggingConfig {
            level: "debug".to_string(),
            json: true,
            file: Some(log_dir.clone()),
        };

        let (subscriber, guard) = build(&config).expect("build");
        assert!(guard.is_some());
        assert!(log_dir.is_dir());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("registry unreachable");
        });
        drop(guard);

        let written: String = std::fs::read_dir(&log_dir)
            .expect("read_dir")
            .map(|entry| entry.expect("entry").path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
            })
            .map(|path| std::fs::read_to_string(path).expect("read"))
            .collect();
        assert!(written.contains("registry unreachable"));
    }

    #[test]
    fn test_stderr_only_has_no_guard() {
        let (_subscriber, guard) = build(&LoggingConfig::default()).expect("build");
        assert!(guard.is_none());
    }
}
