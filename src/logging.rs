//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the filter: `RUST_LOG` when set, the configured level otherwise
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", config.level, e))),
    }
}

/// Install the global subscriber with console and optional rolling file output
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;

    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(config.ansi)
            .boxed()
    };

    let file = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|e| {
                Error::Config(format!(
                    "cannot create log directory {}: {}",
                    directory.display(),
                    e
                ))
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, directory, &config.file_prefix);
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_rejects_garbage_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "memclist=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(env_filter(&config), Err(Error::Config(_))));
        assert!(env_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_init_twice_fails() {
        let config = LoggingConfig {
            ansi: false,
            ..LoggingConfig::default()
        };
        // The first call may lose against another test's subscriber; the second never wins.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
