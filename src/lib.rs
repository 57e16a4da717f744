#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Severe-error reports for plugin-hosted scripting runtimes.
//!
//! ## Overview
//!
//! When something goes badly wrong inside a runtime that hosts third-party
//! contributors (plugins, addons, mods), operators need one consistent,
//! information-dense artifact describing the failure: who failed, what else
//! was installed, what the error chain looked like, and which versions were
//! running. This crate builds exactly that report and writes it line by line
//! into a [`LogSink`], without ever failing on malformed error input.
//!
//! ## Quick Example
//!
//! ```
//! use crashprint::prelude::*;
//!
//! let environment = Environment::new(
//!     StaticInventory(vec![Component::new("Lithium", "lithium", "0.14.3")]),
//!     VersionInfo::unknown("2.1.0"),
//! );
//!
//! let failure = TracedError::new("script engine stalled");
//! let contributor = Contributor::new("scroll", "2.1.0");
//!
//! let mut lines: Vec<String> = Vec::new();
//! let outcome = ReportBuilder::new(&environment, &contributor)
//!     .error(&failure)
//!     .message("Failed to tick the script scheduler")
//!     .emit(&mut lines)
//!     .expect("providers never fail here");
//!
//! assert!(outcome.is_fresh());
//! assert!(lines.iter().any(|line| line == "#!#! [scroll] Severe Error:"));
//! ```
//!
//! ## Report Layout
//!
//! Every report has the same sections, in the same order, separated by blank
//! lines:
//!
//! 1. a header naming the contributor,
//! 2. the caller's description lines,
//! 3. the installed-component inventory (computed once, see
//!    [`InventorySnapshot`]),
//! 4. guidance text, only when the core runtime itself failed (see
//!    [`VersionChannel`]),
//! 5. the cause chain with stack frames (see [`CauseChain`]),
//! 6. version information,
//! 7. the environment classification,
//! 8. the currently active script,
//! 9. a footer.
//!
//! ## Already-Reported Failures
//!
//! [`ReportBuilder::emit`] returns an [`Outcome`]. Either variant converts
//! into the [`AlreadyReported`] sentinel error, which callers propagate to
//! stop further handling. When a builder is bound to that sentinel, it writes
//! nothing, so a report is never printed twice.
//!
//! ## Ecosystem
//!
//! - **`crashprint-backtrace`** captures real stack traces for synthesized
//!   cause entries and for [`TracedError`]s.
//! - **`crashprint-tracing`** forwards report lines to `tracing` and reads the
//!   currently active script from span fields.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod builder;
pub mod chain;
pub mod channel;
pub mod config;
pub mod environment;
pub mod inventory;
pub mod outcome;
pub mod prelude;
pub mod providers;
pub mod report;
pub mod sink;
pub mod traced;

mod snapshot_cell;

pub use self::{
    builder::{Contributor, ReportBuilder},
    chain::{CauseChain, CauseEntry},
    channel::VersionChannel,
    config::{CoreRuntime, ReportConfig},
    environment::Environment,
    inventory::{Component, InventoryProvider, InventorySnapshot, StaticInventory},
    outcome::{AlreadyReported, Outcome},
    providers::{
        BoxError, ExecutionContext, LanguageRuntime, NamedVersion, OsInfo, Provider,
        ProviderError, StaticContext, VersionInfo, VersionProvider,
    },
    report::Report,
    sink::LogSink,
    traced::{CallerLocation, StackCapture, StackFrame, TracedError},
};

// Not public API. Referenced by crashprint-backtrace.
#[doc(hidden)]
pub mod __private {
    // Used by crashprint-backtrace to recognise frames from this crate
    pub const CRASHPRINT_LOCATION: &core::panic::Location = core::panic::Location::caller();
}
