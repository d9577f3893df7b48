use std::env;

use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding filter directives that override `--verbose`.
pub const LOG_ENV: &str = "FTPUSH_LOG";

/// Inputs that select what diagnostics are emitted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogConfig {
    verbose: bool,
    directives: Option<String>,
    ansi: bool,
}

impl LogConfig {
    /// Creates a config from the `--verbose` switch alone.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            directives: None,
            ansi: false,
        }
    }

    /// Creates a config from the `--verbose` switch and [`LOG_ENV`].
    ///
    /// An unset or blank variable is ignored.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let directives = env::var(LOG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self {
            directives,
            ..Self::new(verbose)
        }
    }

    /// Replaces the filter directives.
    #[must_use]
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// Enables or disables ANSI styling of diagnostic lines.
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Returns whether `--verbose` was given.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns the explicit filter directives, if any.
    #[must_use]
    pub fn directives(&self) -> Option<&str> {
        self.directives.as_deref()
    }

    /// Returns whether diagnostics may be styled.
    #[must_use]
    pub const fn ansi(&self) -> bool {
        self.ansi
    }

    /// Returns the level applied to targets no directive mentions.
    #[must_use]
    pub const fn default_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_kept_verbatim() {
        let config = LogConfig::new(false).with_directives("ftpush::retry=debug");
        assert_eq!(config.directives(), Some("ftpush::retry=debug"));
        assert!(!config.verbose());
    }

    #[test]
    fn ansi_is_off_unless_requested() {
        assert!(!LogConfig::new(true).ansi());
        assert!(LogConfig::new(true).with_ansi(true).ansi());
    }
}
