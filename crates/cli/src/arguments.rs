//! Command-line surface.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgAction, Command, value_parser};

/// Program name used in usage and diagnostics.
pub(crate) const PROGRAM_NAME: &str = "ftpush";

/// Arguments after parsing, before any environment lookup or validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) target: String,
    pub(crate) username: String,
    pub(crate) passvar: String,
    pub(crate) source: PathBuf,
    pub(crate) excludes: Vec<String>,
    pub(crate) parallel: NonZeroUsize,
    pub(crate) active: bool,
    pub(crate) timeout: Duration,
    pub(crate) retries: u32,
    pub(crate) no_color: bool,
    pub(crate) verbose: bool,
}

/// Builds the `clap` command used for parsing.
pub(crate) fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mirror a local directory tree onto an FTP server.")
        .after_help(
            "The password is read from the environment variable named by --passvar; \
             it is never accepted on the command line.",
        )
        .arg(
            Arg::new("target")
                .long("target")
                .short('t')
                .value_name("URL")
                .help("FTP URL (ftp://host[:port]/path).")
                .required(true),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .short('u')
                .value_name("NAME")
                .help("FTP user name.")
                .required(true),
        )
        .arg(
            Arg::new("passvar")
                .long("passvar")
                .short('p')
                .value_name("VAR")
                .help("Name of the environment variable holding the FTP password.")
                .required(true),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .value_name("PATH")
                .help("Source file or directory.")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('x')
                .value_name("PATTERN")
                .help("Excluded patterns: never copied from the source nor deleted from the target.")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .value_name("N")
                .help("Maximum number of background connections.")
                .value_parser(value_parser!(u16).range(1..))
                .default_value("5"),
        )
        .arg(
            Arg::new("active")
                .long("active")
                .help("Use active mode for FTP data connections.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .help("Per-command timeout in seconds.")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("30"),
        )
        .arg(
            Arg::new("retries")
                .long("retries")
                .value_name("N")
                .help("Maximum attempts per FTP command.")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("30"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable coloured output.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Print tracing information.")
                .action(ArgAction::SetTrue),
        )
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;

    let required = |value: Option<String>| value.unwrap_or_default();
    let parallel = matches.remove_one::<u16>("parallel").unwrap_or(5);
    Ok(ParsedArgs {
        target: required(matches.remove_one::<String>("target")),
        username: required(matches.remove_one::<String>("username")),
        passvar: required(matches.remove_one::<String>("passvar")),
        source: matches.remove_one::<PathBuf>("source").unwrap_or_default(),
        excludes: matches
            .remove_many::<String>("exclude")
            .map(Iterator::collect)
            .unwrap_or_default(),
        parallel: NonZeroUsize::new(usize::from(parallel)).unwrap_or(NonZeroUsize::MIN),
        active: matches.get_flag("active"),
        timeout: Duration::from_secs(matches.remove_one::<u64>("timeout").unwrap_or(30)),
        retries: matches.remove_one::<u32>("retries").unwrap_or(30),
        no_color: matches.get_flag("no-color"),
        verbose: matches.get_flag("verbose"),
    })
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    const REQUIRED: [&str; 9] = [
        "ftpush", "-t", "ftp://example.com/site", "-u", "deploy", "-p", "FTP_PASSWORD", "-s",
        "public",
    ];

    fn parse(extra: &[&str]) -> Result<ParsedArgs, clap::Error> {
        parse_args(REQUIRED.iter().chain(extra))
    }

    #[test]
    fn command_definition_is_consistent() {
        clap_command().debug_assert();
    }

    #[test]
    fn defaults_match_documented_values() {
        let parsed = parse(&[]).unwrap();
        assert_eq!(parsed.target, "ftp://example.com/site");
        assert_eq!(parsed.username, "deploy");
        assert_eq!(parsed.passvar, "FTP_PASSWORD");
        assert_eq!(parsed.source, PathBuf::from("public"));
        assert!(parsed.excludes.is_empty());
        assert_eq!(parsed.parallel.get(), 5);
        assert!(!parsed.active);
        assert_eq!(parsed.timeout, Duration::from_secs(30));
        assert_eq!(parsed.retries, 30);
        assert!(!parsed.no_color);
        assert!(!parsed.verbose);
    }

    #[test]
    fn excludes_accept_several_values_and_repeat() {
        let parsed = parse(&["-x", "*.log", "cache", "--exclude", "/tmp"]).unwrap();
        assert_eq!(parsed.excludes, ["*.log", "cache", "/tmp"]);
    }

    #[test]
    fn long_options_are_recognised() {
        let parsed = parse(&[
            "--parallel",
            "2",
            "--active",
            "--timeout",
            "5",
            "--retries",
            "3",
            "--no-color",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(parsed.parallel.get(), 2);
        assert!(parsed.active);
        assert_eq!(parsed.timeout, Duration::from_secs(5));
        assert_eq!(parsed.retries, 3);
        assert!(parsed.no_color);
        assert!(parsed.verbose);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let error = parse(&["--parallel", "0"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_required_option_is_rejected() {
        let error = parse_args(["ftpush", "-t", "ftp://example.com/"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn help_is_reported_as_display_request() {
        let error = parse_args(["ftpush", "--help"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        assert!(!error.use_stderr());
    }
}
