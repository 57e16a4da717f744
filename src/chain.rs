//! Lazy traversal of an error's cause chain.

use alloc::{borrow::Cow, string::ToString, vec::Vec};
use core::{error::Error, iter::FusedIterator};

use crate::traced::{StackFrame, TracedError};

/// One entry of a [`CauseChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CauseEntry<'a> {
    /// The error's `Display` output.
    pub description: Cow<'a, str>,
    /// The error's frames, innermost first.
    pub frames: Cow<'a, [StackFrame]>,
}

/// An iterator over an error and its causes, from the outermost error to the
/// root cause.
///
/// Causes are followed through [`Error::source`]. Frames come from
/// [`TracedError`]s in the chain; every other error yields no frames.
///
/// The chain can be preceded by a synthesized entry which is yielded first
/// and does not take part in the source walk. The iterator never mutates the
/// underlying errors; to restart it, derive a new chain from the same error.
/// An error that shows up a second time in its own chain ends the walk.
///
/// ```rust
/// use crashprint::{CauseChain, TracedError};
///
/// let err = TracedError::new("could not load script")
///     .with_source(TracedError::new("unexpected end of file"));
///
/// let descriptions: Vec<_> = CauseChain::new(&err)
///     .map(|entry| entry.description.into_owned())
///     .collect();
/// assert_eq!(descriptions, ["could not load script", "unexpected end of file"]);
/// ```
#[must_use]
pub struct CauseChain<'a> {
    head: Option<CauseEntry<'a>>,
    next: Option<&'a (dyn Error + 'static)>,
    visited: Vec<*const (dyn Error + 'static)>,
}

impl<'a> CauseChain<'a> {
    /// Creates a chain starting at `error`.
    pub fn new(error: &'a (dyn Error + 'static)) -> Self {
        Self {
            head: None,
            next: Some(error),
            visited: Vec::new(),
        }
    }

    /// Creates a chain that yields a synthesized entry first, then walks
    /// `error` (if any) and its causes.
    pub fn synthesized(
        description: impl Into<Cow<'a, str>>,
        frames: Vec<StackFrame>,
        error: Option<&'a (dyn Error + 'static)>,
    ) -> Self {
        Self {
            head: Some(CauseEntry {
                description: description.into(),
                frames: Cow::Owned(frames),
            }),
            next: error,
            visited: Vec::new(),
        }
    }
}

impl<'a> Iterator for CauseChain<'a> {
    type Item = CauseEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(head) = self.head.take() {
            return Some(head);
        }

        let current = self.next.take()?;
        // A wrapper shares its address with its first field, so the vtable
        // has to match too. Zero-sized errors may share both without being
        // the same error.
        if core::mem::size_of_val(current) != 0 {
            let pointer: *const (dyn Error + 'static) = current;
            if self.visited.iter().any(|&seen| core::ptr::eq(seen, pointer)) {
                return None;
            }
            self.visited.push(pointer);
        }

        self.next = current.source();
        Some(CauseEntry {
            description: Cow::Owned(current.to_string()),
            frames: Cow::Borrowed(TracedError::frames_of(current)),
        })
    }
}

impl FusedIterator for CauseChain<'_> {}
