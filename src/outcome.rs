//! The "already reported" sentinel and the outcome of emitting a report.

use core::fmt;

/// Sentinel error meaning "this failure has been fully reported".
///
/// Return it (usually boxed, via `?`) from whatever code path observed the
/// failure, so that surrounding error handling stops without printing the
/// failure again. A [`ReportBuilder`](crate::ReportBuilder) bound to an
/// `AlreadyReported` error writes nothing.
///
/// ```rust
/// use crashprint::AlreadyReported;
///
/// fn load() -> Result<(), Box<dyn core::error::Error + Send + Sync>> {
///     Err(AlreadyReported)?
/// }
///
/// let err = load().unwrap_err();
/// assert!(err.downcast_ref::<AlreadyReported>().is_some());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failure has already been reported")
    }
}

impl core::error::Error for AlreadyReported {}

/// What [`ReportBuilder::emit`](crate::ReportBuilder::emit) did.
///
/// Both variants mean the failure is now fully reported; the distinction
/// tells the caller whether this call produced the output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[must_use = "propagate the sentinel so the failure is not handled twice"]
pub enum Outcome {
    /// A fresh report was written to the sink.
    Reported,
    /// The bound error was already a sentinel; nothing was written.
    AlreadyReported,
}

impl Outcome {
    /// Returns `true` if this call wrote a report.
    #[must_use]
    pub const fn is_fresh(self) -> bool {
        matches!(self, Self::Reported)
    }

    /// The sentinel to propagate.
    pub const fn sentinel(self) -> AlreadyReported {
        AlreadyReported
    }
}

impl From<Outcome> for AlreadyReported {
    fn from(_: Outcome) -> Self {
        AlreadyReported
    }
}
