#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the command-line front-end of ftpush. It parses the arguments,
//! reads the FTP password from the environment variable the user names,
//! installs diagnostics, and runs [`engine::synchronize`] with sessions
//! opened by [`transport::FtpSession`], printing every reconciliation
//! decision as it is made.
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for
//! standard output and error and returns the process exit code, so the binary
//! is a thin wrapper and the whole front-end is testable in-process. Parsing
//! uses the `clap` builder API; the result is validated into a [`Config`].
//!
//! # Invariants
//!
//! - `run` never panics on bad input; every failure becomes a diagnostic on
//!   the error handle and a non-zero exit code.
//! - The password never appears on the command line or in debug output.
//!
//! # Errors
//!
//! Usage and configuration problems exit with [`EXIT_USAGE`]. A run that
//! aborts exits with [`EXIT_FAILURE`] after printing the failure and, when the
//! server sent one, its reply code.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["ftpush", "--target", "sftp://example.com/"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, cli::EXIT_USAGE);
//! assert!(stdout.is_empty());
//! ```

mod arguments;
mod config;
mod reporter;

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use engine::{SyncSummary, synchronize};
use is_terminal::IsTerminal;
use logging::{InitError, LogConfig, init_tracing};
use transport::{FtpSession, FtpSettings};

use crate::arguments::{PROGRAM_NAME, parse_args};
use crate::reporter::{Tone, write_line};

pub use crate::config::{Config, ConfigError, FTP_SCHEME, Target};
pub use crate::reporter::ConsoleReporter;

/// Exit code of a run that completed.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code of a run that started but aborted.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for invalid arguments or configuration.
pub const EXIT_USAGE: i32 = 2;

/// Maximum exit code representable by a Unix process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Runs the CLI using the provided argument iterator and output handles.
///
/// The password variable is looked up in the process environment.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    run_with_env(arguments, |name| env::var(name).ok(), stdout, stderr)
}

/// Like [`run`], resolving the password variable through `lookup` instead of
/// the process environment.
pub fn run_with_env<I, S, L, Out, Err>(
    arguments: I,
    lookup: L,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    L: Fn(&str) -> Option<String>,
    Out: Write,
    Err: Write,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => {
            if error.use_stderr() {
                let _ = write!(stderr, "{error}");
                return EXIT_USAGE;
            }
            let _ = write!(stdout, "{error}");
            return EXIT_SUCCESS;
        }
    };

    let config = match Config::from_args(parsed, lookup) {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME}: error: {error}");
            return EXIT_USAGE;
        }
    };

    execute(&config, stdout, stderr)
}

fn execute<Out, Err>(config: &Config, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    let color = !config.no_color() && io::stdout().is_terminal();
    let log_config = LogConfig::from_env(config.verbose())
        .with_ansi(!config.no_color() && io::stderr().is_terminal());
    match init_tracing(&log_config) {
        Ok(()) | Err(InitError::Install(_)) => {}
        Err(error) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME}: warning: {error}");
        }
    }

    let ftp = Arc::new(config.ftp().clone());
    let factory = {
        let ftp = Arc::clone(&ftp);
        move || FtpSession::open(Arc::clone(&ftp))
    };

    let reporter = ConsoleReporter::new(&mut *stdout, color);
    let outcome = synchronize(config.sync(), factory, &reporter);
    let stdout = reporter.into_inner();

    match outcome {
        Ok(summary) => {
            report_summary(stdout, color, &ftp, &summary);
            EXIT_SUCCESS
        }
        Err(error) => {
            let _ = write_line(
                stderr,
                color,
                Tone::Red,
                &format_args!("{PROGRAM_NAME}: error: {error}"),
            );
            if let Some(code) = error.status_code() {
                let _ = writeln!(stderr, "{PROGRAM_NAME}: server replied with status {code}");
            }
            tracing::debug!(target: "ftpush::cli", error = ?error, "run aborted");
            EXIT_FAILURE
        }
    }
}

fn report_summary<Out: Write + ?Sized>(
    stdout: &mut Out,
    color: bool,
    ftp: &FtpSettings,
    summary: &SyncSummary,
) {
    let line = format!("Synchronized with {}: {summary}", ftp.host());
    let _ = write_line(stdout, color, Tone::Green, &line);
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
///
/// Negative statuses report [`EXIT_FAILURE`]; values above 255 saturate.
#[must_use]
pub fn exit_code_from(status: i32) -> ExitCode {
    let clamped = if status < 0 {
        EXIT_FAILURE
    } else {
        status.min(MAX_EXIT_CODE)
    };
    ExitCode::from(u8::try_from(clamped).unwrap_or(u8::MAX))
}
