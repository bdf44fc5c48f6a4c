//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` wins over the configured level when set. When a log file is
/// configured, events go there instead of stderr; a file that cannot be
/// opened falls back to stderr with a note, since losing the logs is
/// worse than logging to the wrong place.
pub fn init_logging(config: &LoggingConfig) {
    use std::sync::Arc;

    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut open_error = None;
    let writer = match &config.file {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => BoxMakeWriter::new(Arc::new(file)),
            Err(e) => {
                open_error = Some(format!("cannot open log file {}: {e}", path.display()));
                BoxMakeWriter::new(std::io::stderr)
            }
        },
        None => BoxMakeWriter::new(std::io::stderr),
    };

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }

    if let Some(msg) = open_error {
        tracing::warn!("{msg}, logging to stderr");
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Only the first subscriber installation wins in-process, so this
    // checks the file plumbing rather than global state.
    #[test]
    fn test_init_with_log_file_creates_it() {
        let path = std::env::temp_dir().join(format!(
            "cutsync_log_test_{}_{}.log",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        init_logging(&LoggingConfig {
            level: "info".to_string(),
            json: false,
            file: Some(path.clone()),
        });
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_init_with_unopenable_file_does_not_panic() {
        init_logging(&LoggingConfig {
            level: "info".to_string(),
            json: false,
            file: Some(PathBuf::from("/nonexistent_dir_for_logs/out.log")),
        });
    }
}
