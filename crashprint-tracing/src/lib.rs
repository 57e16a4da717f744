#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Tracing integration for crashprint reports.
//!
//! - [`TracingSink`] writes every report line as a `tracing` event, so
//!   reports end up wherever the rest of your logs go.
//! - [`ScriptLayer`] remembers the `script` field of spans, and
//!   [`SpanScriptProbe`] reports the innermost one as the "current script" of
//!   a report.
//!
//! # Quick Start
//!
//! ```
//! use crashprint::{Contributor, Environment, ReportBuilder, TracedError, VersionInfo};
//! use crashprint::inventory::StaticInventory;
//! use crashprint_tracing::{ScriptLayer, SpanScriptProbe, TracingSink};
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//!
//! // 1. Set up tracing with ScriptLayer
//! let subscriber = Registry::default()
//!     .with(ScriptLayer) // Records `script` span fields
//!     .with(tracing_subscriber::fmt::layer()); // Your normal console output
//! tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
//!
//! // 2. Read the current script from spans
//! let environment = Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"))
//!     .execution_context(SpanScriptProbe::new("DEDICATED_SERVER"));
//! let scroll = Contributor::new("scroll", "2.1.0");
//!
//! // 3. Report failures through tracing
//! #[tracing::instrument(fields(script = name))]
//! fn run_script(environment: &Environment, scroll: &Contributor, name: &str) {
//!     let failure = TracedError::new("unknown effect 'explode'");
//!     ReportBuilder::new(environment, scroll)
//!         .error(&failure)
//!         .emit(&mut TracingSink::new())
//!         .expect("providers do not fail here");
//! }
//! run_script(&environment, &scroll, "farm.sk");
//! ```
//!
//! Output (abridged):
//! ```text
//! ERROR run_script{script="farm.sk"}: crashprint: #!#! [scroll] Severe Error:
//! ...
//! ERROR run_script{script="farm.sk"}: crashprint: #!#! Current script: farm.sk
//! ```
//!
//! **Note:** without [`ScriptLayer`] in the subscriber, the current script
//! always reads `null`.

use std::{borrow::Cow, fmt};

use crashprint::{BoxError, ExecutionContext, LogSink};
use tracing::{
    Level, Span,
    field::{Field, Visit},
};
use tracing_subscriber::registry::LookupSpan;

/// Span field holding the name of the active script.
pub const SCRIPT_FIELD: &str = "script";

/// [`LogSink`] forwarding every line to `tracing`, under the `crashprint`
/// target.
///
/// # Examples
///
/// ```
/// use crashprint::LogSink;
/// use crashprint_tracing::TracingSink;
///
/// let mut sink = TracingSink::new().with_level(tracing::Level::WARN);
/// sink.write_line("#!#! End of Error.");
/// ```
#[derive(Copy, Clone, Debug)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    /// Creates a sink logging at [`Level::ERROR`].
    pub fn new() -> Self {
        Self {
            level: Level::ERROR,
        }
    }

    /// Sets the level every line is logged at.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// The level lines are logged at.
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TracingSink {
    fn write_line(&mut self, line: &str) {
        // Event levels must be known statically
        if self.level == Level::ERROR {
            tracing::event!(target: "crashprint", Level::ERROR, "{line}");
        } else if self.level == Level::WARN {
            tracing::event!(target: "crashprint", Level::WARN, "{line}");
        } else if self.level == Level::INFO {
            tracing::event!(target: "crashprint", Level::INFO, "{line}");
        } else if self.level == Level::DEBUG {
            tracing::event!(target: "crashprint", Level::DEBUG, "{line}");
        } else {
            tracing::event!(target: "crashprint", Level::TRACE, "{line}");
        }
    }
}

/// The script recorded for a span.
#[derive(Clone, Debug)]
struct CurrentScript(String);

/// Picks the [`SCRIPT_FIELD`] out of a span's fields.
#[derive(Default)]
struct ScriptVisitor {
    script: Option<String>,
}

impl Visit for ScriptVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == SCRIPT_FIELD {
            self.script = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == SCRIPT_FIELD {
            self.script = Some(format!("{value:?}"));
        }
    }
}

/// A tracing layer that records the [`SCRIPT_FIELD`] of every span.
///
/// **Required for [`SpanScriptProbe`].** Add it to your subscriber alongside
/// your other layers; it never emits anything itself.
///
/// The field may be set when the span is created or recorded later:
///
/// ```
/// use crashprint_tracing::ScriptLayer;
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
///
/// let subscriber = Registry::default().with(ScriptLayer);
/// tracing::subscriber::with_default(subscriber, || {
///     let span = tracing::info_span!("load", script = tracing::field::Empty);
///     span.record("script", "farm.sk");
/// });
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct ScriptLayer;

impl ScriptLayer {
    fn store<'a, S>(span: &tracing_subscriber::registry::SpanRef<'a, S>, visitor: ScriptVisitor)
    where
        S: LookupSpan<'a>,
    {
        if let Some(script) = visitor.script {
            span.extensions_mut().replace(CurrentScript(script));
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for ScriptLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = ScriptVisitor::default();
        attrs.record(&mut visitor);
        Self::store(&span, visitor);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = ScriptVisitor::default();
        values.record(&mut visitor);
        Self::store(&span, visitor);
    }
}

/// [`ExecutionContext`] reading the current script from tracing spans.
///
/// The current script is the [`SCRIPT_FIELD`] of the innermost entered span
/// that has one, as recorded by [`ScriptLayer`]. Outside of any such span,
/// or when the subscriber is not a [`Registry`](tracing_subscriber::Registry),
/// there is no current script.
#[derive(Clone, Debug)]
pub struct SpanScriptProbe {
    environment: Cow<'static, str>,
}

impl SpanScriptProbe {
    /// Creates a probe reporting `environment` as the environment
    /// classification.
    pub fn new(environment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl ExecutionContext for SpanScriptProbe {
    fn environment(&self) -> Result<Cow<'_, str>, BoxError> {
        Ok(Cow::Borrowed(self.environment.as_ref()))
    }

    fn current_script(&self) -> Result<Option<String>, BoxError> {
        let script = Span::current().with_subscriber(|(span_id, dispatch)| {
            let registry = dispatch.downcast_ref::<tracing_subscriber::Registry>()?;
            let span = registry.span(span_id)?;
            span.scope().find_map(|ancestor| {
                ancestor
                    .extensions()
                    .get::<CurrentScript>()
                    .map(|script| script.0.clone())
            })
        });
        Ok(script.flatten())
    }
}
