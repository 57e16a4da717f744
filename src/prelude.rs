//! Commonly used items for convenient importing.
//!
//! Hosts usually need the same handful of types: an [`Environment`] built
//! once at startup, a [`Contributor`] per plugin, and a [`ReportBuilder`] per
//! failure. The prelude brings them in with a single use statement.
//!
//! # Usage
//!
//! ```rust
//! use crashprint::prelude::*;
//!
//! fn tick(environment: &Environment, scroll: &Contributor) -> Result<(), AlreadyReported> {
//!     let failure = TracedError::new("trigger queue overflowed");
//!     let mut lines: Vec<String> = Vec::new();
//!     let outcome = ReportBuilder::new(environment, scroll)
//!         .error(&failure)
//!         .emit(&mut lines)
//!         .map_err(|_| AlreadyReported)?;
//!     Err(outcome.into())
//! }
//!
//! let environment = Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"));
//! let scroll = Contributor::new("scroll", "2.1.0");
//! assert_eq!(tick(&environment, &scroll), Err(AlreadyReported));
//! ```

pub use crate::{
    AlreadyReported, Component, Contributor, Environment, ExecutionContext, InventoryProvider,
    LogSink, Outcome, ReportBuilder, StackFrame, StaticContext, StaticInventory, TracedError,
    VersionInfo, VersionProvider,
};
