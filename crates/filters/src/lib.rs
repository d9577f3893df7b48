#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `filters` decides which paths a synchronization run must leave alone. The
//! user supplies an ordered list of glob patterns; every local entry and every
//! remote entry is classified against that list before it is added, replaced,
//! or deleted. A path that matches any pattern is excluded in both directions:
//! it is never copied from the source and never removed from the target.
//!
//! # Design
//!
//! - [`ExclusionRule`] keeps the pattern text exactly as the user wrote it so
//!   reporters can explain *why* an entry was skipped, next to a compiled
//!   [`globset::GlobSet`] that does the matching.
//! - [`ExclusionSet`] owns the rules in declaration order and answers
//!   [`matches`](ExclusionSet::matches) with the first rule that applies.
//! - Matching happens on root-relative paths. Both `\` and `/` are accepted as
//!   separators on either side and are normalised to `/` before matching.
//!
//! # Invariants
//!
//! - Rules are evaluated in declaration order and the first match wins.
//! - `*` and `?` never cross a separator; `**` spans any number of segments.
//! - Matching ignores ASCII and Unicode case.
//! - An unanchored pattern matches any contiguous run of whole segments, so
//!   `node_modules` excludes `node_modules`, `web/node_modules`, and everything
//!   beneath either. A leading `/` anchors the pattern to the root.
//! - A trailing `/` is accepted and ignored.
//!
//! # Errors
//!
//! [`ExclusionSet::compile`] reports [`FilterError`] when a pattern is empty
//! or expands to an invalid glob expression. The error carries the offending
//! pattern and, for glob failures, the underlying [`globset::Error`].
//!
//! # Escaping
//!
//! `\` is a separator, not an escape character. A literal `*`, `?` or `[` in
//! a file name is written as a one-character class: `[*]`, `[?]`, `[[]`.
//!
//! Braces are alternation, so `*.{jpg,png}` matches either extension. A
//! literal brace is written `[{]` or `[}]`.
//!
//! # Examples
//!
//! ```
//! use filters::ExclusionSet;
//!
//! let excludes = ExclusionSet::compile(["node_modules", "*.log", "/cache"]).unwrap();
//!
//! assert_eq!(
//!     excludes.matches("web/node_modules/lib/index.js").map(|rule| rule.pattern()),
//!     Some("node_modules")
//! );
//! assert!(excludes.is_excluded("logs/Today.LOG"));
//! assert!(excludes.is_excluded("cache/thumbs"));
//! assert!(!excludes.is_excluded("assets/cache"));
//! assert!(excludes.matches("index.html").is_none());
//! ```

mod error;
mod rule;
mod set;

pub use error::FilterError;
pub use rule::{ExclusionRule, normalize_separators};
pub use set::ExclusionSet;
