//! Progress output on the console.

use std::cell::RefCell;
use std::io::Write;

use engine::{ItemAction, Reporter, SyncEvent};

const RESET: &str = "\x1b[0m";

/// ANSI colour used for a kind of console line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Tone {
    Green,
    Red,
    Yellow,
    Grey,
    Plain,
}

impl Tone {
    const fn escape(self) -> &'static str {
        match self {
            Self::Green => "\x1b[32m",
            Self::Red => "\x1b[31m",
            Self::Yellow => "\x1b[33m",
            Self::Grey => "\x1b[90m",
            Self::Plain => "",
        }
    }

    pub(crate) const fn of(action: ItemAction) -> Self {
        match action {
            ItemAction::Add => Self::Green,
            ItemAction::Delete => Self::Red,
            ItemAction::Replace => Self::Yellow,
            ItemAction::Skip => Self::Grey,
            ItemAction::Synchronize => Self::Plain,
        }
    }
}

/// Writes `line` followed by a newline, wrapped in `tone` when `color` is set.
pub(crate) fn write_line<W: Write + ?Sized>(
    out: &mut W,
    color: bool,
    tone: Tone,
    line: &dyn std::fmt::Display,
) -> std::io::Result<()> {
    if color && tone != Tone::Plain {
        writeln!(out, "{}{line}{RESET}", tone.escape())
    } else {
        writeln!(out, "{line}")
    }
}

/// Prints one indented line per event, optionally coloured by action.
pub struct ConsoleReporter<W: Write> {
    out: RefCell<W>,
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    /// Creates a reporter writing to `out`.
    pub const fn new(out: W, color: bool) -> Self {
        Self {
            out: RefCell::new(out),
            color,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&self, event: &SyncEvent) {
        let mut out = self.out.borrow_mut();
        let written = write_line(&mut *out, self.color, Tone::of(event.action), event)
            .and_then(|()| out.flush());
        if let Err(error) = written {
            tracing::debug!(target: "ftpush::cli", error = %error, "failed to write progress line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(color: bool, events: &[SyncEvent]) -> String {
        let reporter = ConsoleReporter::new(Vec::new(), color);
        for event in events {
            reporter.report(event);
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn plain_output_matches_event_display() {
        let output = render(
            false,
            &[
                SyncEvent::new(0, ItemAction::Synchronize, "site"),
                SyncEvent::new(1, ItemAction::Add, "a.txt"),
                SyncEvent::new(2, ItemAction::Skip, "cache").with_reason("excluded (cache)"),
            ],
        );
        assert_eq!(output, "site\n  + a.txt\n    cache: excluded (cache)\n");
    }

    #[test]
    fn coloured_output_wraps_changes() {
        let output = render(
            true,
            &[
                SyncEvent::new(1, ItemAction::Delete, "old"),
                SyncEvent::new(0, ItemAction::Synchronize, "site"),
            ],
        );
        assert_eq!(output, "\x1b[31m  - old\x1b[0m\nsite\n");
    }

    #[test]
    fn every_change_has_a_distinct_tone() {
        let tones = [ItemAction::Add, ItemAction::Delete, ItemAction::Replace, ItemAction::Skip]
            .map(Tone::of);
        for (index, tone) in tones.iter().enumerate() {
            assert!(!tones[index + 1..].contains(tone));
        }
    }
}
