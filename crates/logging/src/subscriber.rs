use std::error::Error;
use std::io;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::LogConfig;

/// Failure to install the diagnostic subscriber.
#[derive(Debug, Error)]
pub enum InitError {
    /// The filter directives could not be parsed.
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        /// The rejected directives.
        directives: String,
        /// Parser diagnostic.
        #[source]
        source: ParseError,
    },
    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(#[source] Box<dyn Error + Send + Sync>),
}

/// Builds the event filter for `config`.
///
/// # Errors
///
/// Returns [`InitError::Filter`] when the directives do not parse.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, InitError> {
    let directives = config.directives().unwrap_or_default();
    EnvFilter::builder()
        .with_default_directive(config.default_level().into())
        .parse(directives)
        .map_err(|source| InitError::Filter {
            directives: directives.to_owned(),
            source,
        })
}

/// Installs a `fmt` subscriber that writes diagnostics to stderr.
///
/// Event targets are shown only in verbose mode, where they help tell the
/// control session apart from upload workers.
///
/// # Errors
///
/// Fails when the filter does not parse or a subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<(), InitError> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(config.ansi())
        .with_target(config.verbose())
        .with_thread_names(config.verbose())
        .try_init()
        .map_err(InitError::Install)?;
    tracing::debug!(
        target: "ftpush::logging",
        level = %config.default_level(),
        directives = config.directives().unwrap_or_default(),
        "diagnostics enabled"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn quiet_runs_report_warnings_only() {
        let filter = build_filter(&LogConfig::new(false)).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn verbose_runs_include_debug() {
        let filter = build_filter(&LogConfig::new(true)).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn directives_override_the_switch() {
        let config = LogConfig::new(false).with_directives("ftpush::retry=trace");
        let filter = build_filter(&config).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn malformed_directives_are_rejected() {
        let config = LogConfig::new(false).with_directives("ftpush=loud");
        let error = build_filter(&config).unwrap_err();
        assert!(error.to_string().contains("ftpush=loud"));
    }
}
