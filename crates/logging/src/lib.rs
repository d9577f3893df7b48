#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` installs the process-wide [`tracing`] subscriber used for
//! diagnostics. It is deliberately separate from the progress stream the
//! console reporter prints: progress goes to stdout, diagnostics to stderr.
//!
//! # Design
//!
//! [`LogConfig`] captures the two inputs that decide verbosity: the
//! `--verbose` switch and the `FTPUSH_LOG` environment variable, which takes
//! [`EnvFilter`](tracing_subscriber::EnvFilter) directives and overrides the
//! switch. [`init_tracing`] turns a config into a `fmt` subscriber writing to
//! stderr.
//!
//! # Errors
//!
//! Invalid `FTPUSH_LOG` directives and a second installation attempt are
//! reported as [`InitError`]; neither is fatal to a run.
//!
//! # Examples
//!
//! ```
//! use logging::LogConfig;
//! use tracing_subscriber::filter::LevelFilter;
//!
//! assert_eq!(LogConfig::new(false).default_level(), LevelFilter::WARN);
//! assert_eq!(LogConfig::new(true).default_level(), LevelFilter::DEBUG);
//! ```

mod config;
mod subscriber;

pub use config::{LOG_ENV, LogConfig};
pub use subscriber::{InitError, build_filter, init_tracing};
