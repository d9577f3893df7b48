//! Parsers for the textual replies of `LIST`, `MLSD`, `FEAT` and `MLST`.
//!
//! `LIST` output is meant for people: old entries lose their time of day and
//! times are in the server's zone. `MLSD` and `MLST` facts carry UTC stamps to
//! the second and are preferred whenever the server offers them.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::SystemTime;

use suppaftp::list::File as ListLine;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{EntryKind, RemoteEntry, SessionError, SessionResult};

/// Joins `name` onto the absolute directory `base`.
pub(crate) fn join(base: &str, name: &str) -> String {
    if name.starts_with('/') {
        name.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Parses `LIST` lines, dropping `.`/`..` and lines no parser recognises.
pub(crate) fn parse_listing(base: &str, lines: &[String]) -> Vec<RemoteEntry> {
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines {
        if line.trim().is_empty() || line.starts_with("total ") {
            continue;
        }
        let file = match ListLine::from_str(line) {
            Ok(file) => file,
            Err(error) => {
                tracing::warn!(target: "ftpush::ftp", line = %line, error = ?error, "skipping unparsable listing line");
                continue;
            }
        };
        let name = file.name();
        if name == "." || name == ".." {
            continue;
        }
        let kind = if file.is_directory() {
            EntryKind::Directory
        } else if file.is_symlink() {
            EntryKind::Link
        } else {
            EntryKind::File
        };
        entries.push(RemoteEntry::new(
            name,
            kind,
            Some(file.modified()),
            join(base, name),
        ));
    }
    entries
}

/// Extracts the upper-cased feature keywords from a `FEAT` reply body.
pub(crate) fn parse_features(body: &str) -> HashSet<String> {
    body.lines()
        .filter(|line| line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_ascii_uppercase)
        .collect()
}

/// What the `type` fact of a machine listing names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FactType {
    Entry(EntryKind),
    /// `cdir` or `pdir`: the listed directory itself or its parent.
    Context,
}

/// Splits one `facts; name` line into its type, modification time and path.
fn parse_facts(line: &str) -> Option<(FactType, Option<SystemTime>, &str)> {
    let (facts, path) = line.trim_start().split_once(' ')?;
    let path = path.trim_end_matches(['\r', '\n']);

    let mut kind = None;
    let mut modified = None;
    for fact in facts.split(';') {
        let Some((key, value)) = fact.split_once('=') else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "type" => {
                let value = value.to_ascii_lowercase();
                kind = Some(match value.as_str() {
                    "cdir" | "pdir" => FactType::Context,
                    "dir" => FactType::Entry(EntryKind::Directory),
                    _ if value.starts_with("os.unix=slink")
                        || value.starts_with("os.unix=symlink") =>
                    {
                        FactType::Entry(EntryKind::Link)
                    }
                    _ => FactType::Entry(EntryKind::File),
                });
            }
            "modify" => modified = parse_timestamp(value),
            _ => {}
        }
    }
    Some((kind?, modified, path))
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Parses `MLSD` lines, dropping the `cdir`/`pdir` entries and lines without
/// a `type` fact.
pub(crate) fn parse_machine_listing(base: &str, lines: &[String]) -> Vec<RemoteEntry> {
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match parse_facts(line) {
            Some((FactType::Entry(kind), modified, path)) => {
                let name = base_name(path);
                if name.is_empty() || name == "." || name == ".." {
                    continue;
                }
                entries.push(RemoteEntry::new(name, kind, modified, join(base, name)));
            }
            Some((FactType::Context, ..)) => {}
            None => {
                tracing::warn!(target: "ftpush::ftp", line = %line, "skipping unparsable MLSD line");
            }
        }
    }
    entries
}

/// Parses the fact line of an `MLST` reply body.
pub(crate) fn parse_object_info(body: &str) -> Option<RemoteEntry> {
    let line = body.lines().find(|line| line.starts_with(' '))?;
    let (kind, modified, path) = parse_facts(line)?;
    let kind = match kind {
        FactType::Entry(kind) => kind,
        FactType::Context => EntryKind::Directory,
    };
    let path = path.trim_end();
    Some(RemoteEntry::new(base_name(path), kind, modified, path))
}

/// Formats `time` as the UTC `YYYYMMDDhhmmss` stamp `MFMT`/`MDTM` expect.
pub(crate) fn format_timestamp(time: SystemTime) -> SessionResult<String> {
    OffsetDateTime::from(time)
        .format(format_description!("[year][month][day][hour][minute][second]"))
        .map_err(|error| SessionError::Protocol(format!("cannot format timestamp: {error}")))
}

/// Parses a `YYYYMMDDhhmmss[.sss]` UTC stamp.
pub(crate) fn parse_timestamp(value: &str) -> Option<SystemTime> {
    let whole_seconds = value.split('.').next()?;
    PrimitiveDateTime::parse(
        whole_seconds,
        format_description!("[year][month][day][hour][minute][second]"),
    )
    .ok()
    .map(|stamp| stamp.assume_utc().into())
}
