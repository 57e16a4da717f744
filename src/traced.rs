//! Stack frames and errors that carry them.
//!
//! Rust errors do not record where they were raised. [`TracedError`] is an
//! error type that does: it carries a description, a list of [`StackFrame`]s
//! and an optional source. Reports print the frames of every `TracedError`
//! in the cause chain; any other error type shows up without frames.
//!
//! When a report is bound to no error at all, or to an error without frames,
//! the builder asks a [`StackCapture`] for the current stack instead. The
//! default, [`CallerLocation`], records just the caller of
//! [`ReportBuilder::emit`](crate::ReportBuilder::emit); the
//! `crashprint-backtrace` crate provides a full backtrace.

use alloc::{borrow::Cow, boxed::Box, vec, vec::Vec};
use core::{error::Error, fmt, panic::Location};

use crate::providers::BoxError;

/// A single stack frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Function or symbol name, if known.
    pub function: Option<Cow<'static, str>>,
    /// Source file, if known.
    pub file: Option<Cow<'static, str>>,
    /// Line number in `file`.
    pub line: Option<u32>,
    /// Column number in `file`.
    pub column: Option<u32>,
}

impl StackFrame {
    /// A frame for a source location, e.g. one obtained through
    /// `#[track_caller]`.
    #[must_use]
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            function: None,
            file: Some(Cow::Borrowed(location.file())),
            line: Some(location.line()),
            column: Some(location.column()),
        }
    }

    /// A frame for a named function without source information.
    pub fn function(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            function: Some(name.into()),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Sets the source position of this frame.
    #[must_use]
    pub fn at(mut self, file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

impl fmt::Display for StackFrame {
    /// Formats as `function (file:line:column)`, leaving out whatever is
    /// unknown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(file) = &self.file else {
            return f.write_str(self.function.as_deref().unwrap_or("<unknown>"));
        };

        if let Some(function) = &self.function {
            write!(f, "{function} (")?;
        }
        write!(f, "{file}")?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        if self.function.is_some() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// An error carrying its own stack frames.
///
/// ```rust
/// use crashprint::{StackFrame, TracedError};
///
/// let io = std::io::Error::other("disk full");
/// let err = TracedError::without_frames("failed to save script cache")
///     .with_frames(vec![
///         StackFrame::function("cache::save").at("src/cache.rs", 88),
///         StackFrame::function("cache::flush").at("src/cache.rs", 41),
///     ])
///     .with_source(io);
///
/// assert_eq!(err.to_string(), "failed to save script cache");
/// assert_eq!(err.frames().len(), 2);
/// ```
#[derive(Debug)]
pub struct TracedError {
    description: Cow<'static, str>,
    frames: Vec<StackFrame>,
    source: Option<BoxError>,
}

impl TracedError {
    /// Creates an error whose only frame is the caller's location.
    #[track_caller]
    pub fn new(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            description: description.into(),
            frames: vec![StackFrame::from_location(Location::caller())],
            source: None,
        }
    }

    /// Creates an error without any frames.
    pub fn without_frames(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            description: description.into(),
            frames: Vec::new(),
            source: None,
        }
    }

    /// Replaces the frames of this error, innermost first.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Sets the underlying cause of this error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The description of this error.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The frames of this error, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Returns the frames of `error` if it is a `TracedError`, and an empty
    /// slice otherwise.
    #[must_use]
    pub fn frames_of<'a>(error: &'a (dyn Error + 'static)) -> &'a [StackFrame] {
        error
            .downcast_ref::<Self>()
            .map(Self::frames)
            .unwrap_or_default()
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl Error for TracedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// Captures the current call stack for synthesized cause entries.
pub trait StackCapture: 'static + Send + Sync {
    /// Returns the current stack, innermost first.
    ///
    /// `caller` is the location [`ReportBuilder::emit`](crate::ReportBuilder::emit)
    /// was called from.
    fn capture(&self, caller: &'static Location<'static>) -> Vec<StackFrame>;
}

/// [`StackCapture`] recording only the location of the caller.
#[derive(Copy, Clone, Debug, Default)]
pub struct CallerLocation;

impl StackCapture for CallerLocation {
    fn capture(&self, caller: &'static Location<'static>) -> Vec<StackFrame> {
        vec![StackFrame::from_location(caller)]
    }
}

impl<C: StackCapture + ?Sized> StackCapture for Box<C> {
    fn capture(&self, caller: &'static Location<'static>) -> Vec<StackFrame> {
        (**self).capture(caller)
    }
}
