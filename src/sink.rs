//! Destinations for report lines.

use alloc::{string::String, vec::Vec};

/// Accepts report lines, one at a time, in order.
///
/// Writing is best effort: the sink cannot reject a line and the builder does
/// not wait for any acknowledgment. Lines arrive already prefixed.
///
/// `crashprint-tracing` provides a sink that forwards every line to
/// `tracing`. Collecting into a `Vec<String>` is handy for tests:
///
/// ```rust
/// use crashprint::LogSink;
///
/// let mut lines: Vec<String> = Vec::new();
/// lines.write_line("#!#! End of Error.");
/// assert_eq!(lines, ["#!#! End of Error."]);
/// ```
pub trait LogSink {
    /// Writes one line.
    fn write_line(&mut self, line: &str);
}

impl LogSink for Vec<String> {
    fn write_line(&mut self, line: &str) {
        self.push(String::from(line));
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line);
    }
}

impl<S: LogSink + ?Sized> LogSink for alloc::boxed::Box<S> {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line);
    }
}
