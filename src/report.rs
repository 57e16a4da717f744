//! A fully composed report.

use alloc::{format, string::String, vec::Vec};
use core::fmt;

use crate::sink::LogSink;

/// The ordered lines of one report.
///
/// Lines are stored without the line prefix; the prefix is added when the
/// report is written to a [`LogSink`] or formatted with `Display`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    prefix: &'static str,
    lines: Vec<String>,
}

impl Report {
    pub(crate) fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            lines: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Pushes `text` one physical line at a time, with `lead` in front of the
    /// first one. Empty text still yields one line.
    pub(crate) fn push_text(&mut self, lead: &str, text: &str) {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        self.lines.push(format!("{lead}{first}"));
        self.extend(lines);
    }

    pub(crate) fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub(crate) fn extend<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    /// The unprefixed lines of the report.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The prefix written in front of every line.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Writes every line, prefixed, to `sink`.
    pub fn write_to<S: LogSink + ?Sized>(&self, sink: &mut S) {
        let mut buffer = String::new();
        for line in &self.lines {
            buffer.clear();
            buffer.push_str(self.prefix);
            buffer.push_str(line);
            sink.write_line(&buffer);
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}{line}", self.prefix)?;
        }
        Ok(())
    }
}
