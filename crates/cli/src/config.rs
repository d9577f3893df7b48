//! Validated run configuration assembled from parsed arguments and the
//! process environment.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use transport::{FtpSettings, RetryPolicy, TransferMode};
use url::{Host, Url};

use engine::SyncSettings;
use filters::{ExclusionSet, FilterError};

use crate::arguments::ParsedArgs;

/// The only URL scheme accepted for `--target`.
pub const FTP_SCHEME: &str = "ftp";

/// Failure to turn the command line into a runnable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--target` is not a URL.
    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected value.
        url: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },
    /// `--target` uses a scheme other than `ftp`.
    #[error("unsupported URL scheme '{scheme}': only ftp:// targets are supported")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },
    /// `--target` names no host.
    #[error("target URL '{url}' has no host")]
    MissingHost {
        /// The rejected value.
        url: String,
    },
    /// The password variable is unset or empty.
    #[error(
        "password environment variable '{variable}' is not set for the current process"
    )]
    PasswordUnset {
        /// Name given to `--passvar`.
        variable: String,
    },
    /// An exclusion pattern did not compile.
    #[error(transparent)]
    Exclusion(#[from] FilterError),
}

/// Where the target URL points.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    host: String,
    port: u16,
    path: String,
}

impl Target {
    /// Parses an `ftp://host[:port]/path` URL.
    ///
    /// IPv6 literals lose their brackets and percent-escapes in the path are
    /// decoded. An empty path is the server root.
    ///
    /// ```
    /// use cli::Target;
    ///
    /// let target = Target::parse("ftp://[::1]:2121/www/my%20site").unwrap();
    /// assert_eq!(target.host(), "::1");
    /// assert_eq!(target.port(), 2121);
    /// assert_eq!(target.path(), "/www/my site");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_owned(),
            source,
        })?;
        if url.scheme() != FTP_SCHEME {
            return Err(ConfigError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }
        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_owned(),
            Some(Host::Ipv4(address)) => address.to_string(),
            Some(Host::Ipv6(address)) => address.to_string(),
            _ => {
                return Err(ConfigError::MissingHost {
                    url: raw.to_owned(),
                });
            }
        };
        let path = percent_decode_str(url.path()).decode_utf8_lossy();
        let path = if path.is_empty() { "/".to_owned() } else { path.into_owned() };
        Ok(Self {
            host,
            port: url.port().unwrap_or(FtpSettings::DEFAULT_PORT),
            path,
        })
    }

    /// Returns the host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the control port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the decoded remote path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Everything a run needs: engine settings plus session parameters.
#[derive(Clone, Debug)]
pub struct Config {
    sync: SyncSettings,
    ftp: FtpSettings,
    verbose: bool,
    no_color: bool,
}

impl Config {
    /// Validates parsed arguments, resolving the password through `lookup`.
    pub(crate) fn from_args<L>(args: ParsedArgs, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let target = Target::parse(&args.target)?;
        let password = lookup(&args.passvar)
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ConfigError::PasswordUnset {
                variable: args.passvar.clone(),
            })?;
        let exclusions = ExclusionSet::compile(args.excludes)?;
        let retry = RetryPolicy::new(args.retries);
        let mode = if args.active {
            TransferMode::Active
        } else {
            TransferMode::Passive
        };

        let ftp = FtpSettings::new(target.host, args.username, password)
            .with_port(target.port)
            .with_mode(mode)
            .with_timeout(args.timeout);
        let sync = SyncSettings::new(args.source, target.path)
            .with_exclusions(exclusions)
            .with_parallelism(args.parallel)
            .with_retry(retry);

        Ok(Self {
            sync,
            ftp,
            verbose: args.verbose,
            no_color: args.no_color,
        })
    }

    /// Returns the engine settings.
    #[must_use]
    pub const fn sync(&self) -> &SyncSettings {
        &self.sync
    }

    /// Returns the session parameters.
    #[must_use]
    pub const fn ftp(&self) -> &FtpSettings {
        &self.ftp
    }

    /// Returns whether `--verbose` was given.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns whether `--no-color` was given.
    #[must_use]
    pub const fn no_color(&self) -> bool {
        self.no_color
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::arguments::parse_args;

    fn args(target: &str, extra: &[&str]) -> ParsedArgs {
        let base = ["ftpush", "-t", target, "-u", "deploy", "-p", "PW", "-s", "out"];
        parse_args(base.iter().chain(extra)).unwrap()
    }

    fn environment(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn target_defaults_to_port_21_and_root() {
        let target = Target::parse("ftp://example.com").unwrap();
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.port(), 21);
        assert_eq!(target.path(), "/");
    }

    #[test]
    fn target_keeps_explicit_port_and_path() {
        let target = Target::parse("ftp://10.0.0.7:2121/www/site/").unwrap();
        assert_eq!(target.host(), "10.0.0.7");
        assert_eq!(target.port(), 2121);
        assert_eq!(target.path(), "/www/site/");
    }

    #[test]
    fn other_schemes_are_rejected() {
        for url in ["sftp://example.com/site", "http://example.com/"] {
            let error = Target::parse(url).unwrap_err();
            assert!(matches!(error, ConfigError::UnsupportedScheme { .. }), "{url}");
        }
    }

    #[test]
    fn garbage_is_not_a_url() {
        let error = Target::parse("example.com/site").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidUrl { .. }));
        assert!(error.to_string().contains("example.com/site"));
    }

    #[test]
    fn config_assembles_engine_and_session_settings() {
        let parsed = args(
            "ftp://example.com:2100/www",
            &["-x", "*.log", "--parallel", "2", "--active", "--timeout", "9", "--retries", "4"],
        );
        let config = Config::from_args(parsed, environment(&[("PW", "secret")])).unwrap();

        assert_eq!(config.ftp().host(), "example.com");
        assert_eq!(config.ftp().port(), 2100);
        assert_eq!(config.ftp().username(), "deploy");
        assert_eq!(config.ftp().mode(), TransferMode::Active);
        assert_eq!(config.ftp().timeout(), Duration::from_secs(9));
        assert_eq!(config.sync().remote_root(), "/www");
        assert_eq!(config.sync().local_root(), Path::new("out"));
        assert_eq!(config.sync().parallelism().get(), 2);
        assert_eq!(config.sync().retry().max_attempts(), 4);
        assert!(config.sync().exclusions().is_excluded("app/debug.log"));
        assert!(!format!("{:?}", config.ftp()).contains("secret"));
    }

    #[test]
    fn unset_or_empty_password_names_the_variable() {
        for lookup in [environment(&[]), environment(&[("PW", "")])] {
            let error = Config::from_args(args("ftp://example.com/", &[]), lookup).unwrap_err();
            assert!(matches!(error, ConfigError::PasswordUnset { ref variable } if variable == "PW"));
            assert!(error.to_string().contains("'PW'"));
        }
    }

    #[test]
    fn bad_exclusion_pattern_is_a_configuration_error() {
        let parsed = args("ftp://example.com/", &["-x", "["]);
        let error = Config::from_args(parsed, environment(&[("PW", "x")])).unwrap_err();
        assert!(matches!(error, ConfigError::Exclusion(_)));
    }
}
