//! Composing and emitting reports.

use alloc::{
    borrow::Cow,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{error::Error, panic::Location};

use crate::{
    chain::CauseChain,
    channel::VersionChannel,
    environment::Environment,
    outcome::{AlreadyReported, Outcome},
    providers::{Provider, ProviderError},
    report::Report,
    sink::LogSink,
    traced::TracedError,
};

/// The plugin or module a failure is attributed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contributor {
    /// Name shown in the report header. When it equals the core runtime id,
    /// the report carries guidance text.
    pub name: Cow<'static, str>,
    /// Installed version of the contributor.
    pub version: String,
    /// Where users should report failures of this contributor.
    pub report_url: Option<Cow<'static, str>>,
}

impl Contributor {
    /// Creates a contributor without a report URL.
    pub fn new(name: impl Into<Cow<'static, str>>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            report_url: None,
        }
    }

    /// Sets the issue tracker of this contributor.
    #[must_use]
    pub fn with_report_url(mut self, url: impl Into<Cow<'static, str>>) -> Self {
        self.report_url = Some(url.into());
        self
    }
}

/// Builds the report for one failure.
///
/// A builder is bound to at most one error, a [`Contributor`] and any number
/// of description lines. Calling [`emit`](Self::emit) composes the report
/// and writes it to a sink.
///
/// All providers are queried before the first line is written, so a
/// provider failure leaves the sink untouched.
///
/// ```rust
/// use crashprint::{
///     Contributor, Environment, Outcome, ReportBuilder, VersionInfo,
///     inventory::StaticInventory,
/// };
///
/// let environment = Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"));
/// let contributor = Contributor::new("sculk-addon", "1.4.0")
///     .with_report_url("https://example.org/sculk/issues");
///
/// let mut lines: Vec<String> = Vec::new();
/// let outcome = ReportBuilder::new(&environment, &contributor)
///     .message("Failed to register the sculk sensor syntax")
///     .emit(&mut lines)
///     .unwrap();
///
/// assert_eq!(outcome, Outcome::Reported);
/// assert_eq!(lines[1], "#!#! [sculk-addon] Severe Error:");
/// assert_eq!(lines.last().map(String::as_str), Some("#!#! "));
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct ReportBuilder<'a> {
    environment: &'a Environment,
    contributor: &'a Contributor,
    error: Option<&'a (dyn Error + 'static)>,
    messages: Vec<Cow<'a, str>>,
}

impl<'a> ReportBuilder<'a> {
    /// Creates a builder without an error or description lines.
    pub fn new(environment: &'a Environment, contributor: &'a Contributor) -> Self {
        Self {
            environment,
            contributor,
            error: None,
            messages: Vec::new(),
        }
    }

    /// Binds the failure to report.
    pub fn error(mut self, error: &'a (dyn Error + 'static)) -> Self {
        self.error = Some(error);
        self
    }

    /// Adds a description line. Text spanning several lines is split so
    /// every line gets the prefix.
    pub fn message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Adds several description lines.
    pub fn messages<I>(mut self, messages: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'a, str>>,
    {
        self.messages.extend(messages.into_iter().map(Into::into));
        self
    }

    /// Returns `true` if the bound error is the [`AlreadyReported`] sentinel.
    #[must_use]
    pub fn is_already_reported(&self) -> bool {
        self.error.is_some_and(|error| error.is::<AlreadyReported>())
    }

    /// Composes the report without writing it anywhere.
    ///
    /// Returns `Ok(None)` if the bound error is the [`AlreadyReported`]
    /// sentinel.
    #[track_caller]
    pub fn build(&self) -> Result<Option<Report>, ProviderError> {
        if self.is_already_reported() {
            return Ok(None);
        }
        let caller = Location::caller();

        let environment = self.environment;
        let config = environment.config();
        let inventory = environment.inventory().lines()?;
        let versions = environment
            .versions()
            .version_info()
            .map_err(|source| ProviderError::new(Provider::Version, source))?;
        let context = environment.context();
        let classification = context
            .environment()
            .map_err(|source| ProviderError::new(Provider::ExecutionContext, source))?;
        let script = context
            .current_script()
            .map_err(|source| ProviderError::new(Provider::ExecutionContext, source))?;

        let mut report = Report::new(config.line_prefix);
        report.blank();
        report.push(format!("[{}] Severe Error:", self.contributor.name));
        for message in &self.messages {
            report.push_text("", message);
        }
        report.blank();
        report.extend(inventory.iter().cloned());

        if self.is_core() {
            self.push_guidance(&mut report);
        }

        report.blank();
        report.push("Stack trace:");
        self.push_cause_chain(&mut report, caller);

        report.blank();
        report.push("Version Information:");
        report.push(format!(
            "  {}: {}",
            config.core.display_name, versions.runtime
        ));
        if !self.is_core() {
            report.push(format!(
                "  {}: {}",
                self.contributor.name, self.contributor.version
            ));
        }
        for named in [&versions.host, &versions.platform] {
            report.push(format!("  {}: {}", named.name, named.version));
        }
        let language = &versions.language;
        report.push(format!(
            "  {}: {} {} {}",
            language.name, language.version, language.vendor, language.vm
        ));
        let os = &versions.os;
        report.push(format!("  OS: {} {} {}", os.name, os.arch, os.version));

        report.blank();
        report.push(format!("Environment: {classification}"));
        report.blank();
        report.push(format!(
            "Current script: {}",
            script.as_deref().unwrap_or("null")
        ));
        report.blank();
        report.push("End of Error.");
        report.blank();

        Ok(Some(report))
    }

    /// Composes the report and writes it, line by line, to `sink`.
    ///
    /// Nothing is written if the bound error is the [`AlreadyReported`]
    /// sentinel or a provider fails. Either [`Outcome`] converts into the
    /// sentinel for propagation.
    #[track_caller]
    pub fn emit<S: LogSink + ?Sized>(&self, sink: &mut S) -> Result<Outcome, ProviderError> {
        match self.build()? {
            Some(report) => {
                report.write_to(sink);
                Ok(Outcome::Reported)
            }
            None => Ok(Outcome::AlreadyReported),
        }
    }

    fn is_core(&self) -> bool {
        self.contributor.name == self.environment.config().core.id
    }

    fn push_guidance(&self, report: &mut Report) {
        let config = self.environment.config();
        let core = config.core.display_name;
        let url = config.report_url_or_default(self.contributor.report_url.as_deref());

        match VersionChannel::classify(&self.contributor.version, config) {
            VersionChannel::Nightly => {
                report.push(format!("You're running a (buggy) nightly version of {core}."));
                report.push("If this is not a test server, switch to a more stable release NOW!");
                report.push(format!(
                    "Your players are unlikely to appreciate crashes and/or data loss due to {core} bugs."
                ));
                report.blank();
                report.push(
                    "Just testing things? Good. Please report this bug, so that we can fix it before a stable release.",
                );
                report.push(format!("Issue tracker: {url}"));
            }
            VersionChannel::Stable => {
                report.push(format!("Something went horribly wrong with {core}."));
                report.push(
                    "This issue is NOT your fault! You probably can't fix it yourself, either.",
                );
                report.push(format!(
                    "You should report it at {url}. Please copy paste this report there (or use a paste service)."
                ));
                report.push(
                    "This ensures that your issue is noticed and will be fixed as soon as possible.",
                );
            }
        }
    }

    fn push_cause_chain(&self, report: &mut Report, caller: &'static Location<'static>) {
        let chain = match self.error {
            Some(error) if !TracedError::frames_of(error).is_empty() => CauseChain::new(error),
            error => {
                report.push(
                    "  warning: no/empty exception given, dumping current stack trace instead",
                );
                let frames = self.environment.stack().capture(caller);
                match error {
                    Some(error) => CauseChain::synthesized(error.to_string(), frames, Some(error)),
                    None => CauseChain::synthesized("no error given", frames, None),
                }
            }
        };

        for (index, entry) in chain.enumerate() {
            let lead = if index == 0 { "" } else { "Caused by: " };
            report.push_text(lead, &entry.description);
            report.extend(entry.frames.iter().map(|frame| format!("    at {frame}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{boxed::Box, format, vec};

    use super::*;
    use crate::{
        inventory::StaticInventory,
        providers::{BoxError, VersionInfo},
    };

    fn environment() -> Environment {
        Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"))
    }

    fn stack_trace(lines: &[String]) -> &[String] {
        let start = lines.iter().position(|line| line == "Stack trace:").unwrap() + 1;
        let end = lines
            .iter()
            .position(|line| line == "Version Information:")
            .unwrap()
            - 1;
        &lines[start..end]
    }

    #[test]
    fn test_sentinel_builds_nothing() {
        let environment = environment();
        let contributor = Contributor::new("scroll", "2.1.0");
        let sentinel = AlreadyReported;

        let builder = ReportBuilder::new(&environment, &contributor).error(&sentinel);
        assert!(builder.is_already_reported());
        assert!(builder.build().unwrap().is_none());
        assert!(!environment.inventory().is_populated());
    }

    #[test]
    fn test_absent_error_synthesizes_single_entry() {
        let environment = environment();
        let contributor = Contributor::new("scroll", "2.1.0");

        let line = line!() + 1;
        let report = ReportBuilder::new(&environment, &contributor).build().unwrap().unwrap();

        let trace = stack_trace(report.lines());
        assert_eq!(
            trace[0],
            "  warning: no/empty exception given, dumping current stack trace instead"
        );
        assert_eq!(trace[1], "no error given");
        assert!(trace[2].starts_with(&format!("    at {}:{line}:", file!())));
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_frameless_error_keeps_its_causes() {
        let environment = environment();
        let contributor = Contributor::new("scroll", "2.1.0");
        let error = TracedError::without_frames("could not parse trigger")
            .with_source(TracedError::without_frames("unexpected token"));

        let report = ReportBuilder::new(&environment, &contributor)
            .error(&error)
            .build()
            .unwrap()
            .unwrap();

        let trace: Vec<_> = stack_trace(report.lines())
            .iter()
            .filter(|line| !line.starts_with("    at "))
            .cloned()
            .collect();
        assert_eq!(
            trace,
            [
                "  warning: no/empty exception given, dumping current stack trace instead",
                "could not parse trigger",
                "Caused by: could not parse trigger",
                "Caused by: unexpected token",
            ]
        );
    }

    #[test]
    fn test_multiline_messages_and_causes_are_split() {
        let environment = environment();
        let contributor = Contributor::new("sculk-addon", "1.4.0");
        let error = TracedError::new("could not parse farm.sk")
            .with_source(TracedError::without_frames("unexpected token\n  --> farm.sk:3:7"));

        let mut lines: Vec<String> = Vec::new();
        let outcome = ReportBuilder::new(&environment, &contributor)
            .error(&error)
            .message("Failed to load farm.sk\nwhile reloading scripts")
            .emit(&mut lines)
            .unwrap();
        assert_eq!(outcome, Outcome::Reported);

        assert_eq!(lines[2], "#!#! Failed to load farm.sk");
        assert_eq!(lines[3], "#!#! while reloading scripts");
        let cause = lines
            .iter()
            .position(|line| line == "#!#! Caused by: unexpected token")
            .unwrap();
        assert_eq!(lines[cause + 1], "#!#!   --> farm.sk:3:7");
        assert!(lines.iter().all(|line| !line.contains('\n')));
    }

    #[test]
    fn test_stable_guidance_uses_contributor_url() {
        let environment = environment();
        let contributor =
            Contributor::new("scroll", "2.1.0").with_report_url("https://example.org/issues");

        let report = ReportBuilder::new(&environment, &contributor).build().unwrap().unwrap();
        let expected = "You should report it at https://example.org/issues. \
                        Please copy paste this report there (or use a paste service).";
        assert!(report.lines().iter().any(|line| line == expected));
    }

    #[test]
    fn test_non_core_contributor_gets_no_guidance() {
        let environment = environment();
        let contributor = Contributor::new("sculk-addon", "1.0.0-nightly");

        let report = ReportBuilder::new(&environment, &contributor).build().unwrap().unwrap();
        assert!(
            !report
                .lines()
                .iter()
                .any(|line| line.contains("nightly version") || line.contains("horribly wrong"))
        );
        assert!(report.lines().contains(&"  sculk-addon: 1.0.0-nightly".to_string()));
    }

    #[test]
    fn test_context_failure_names_provider() {
        struct Broken;

        impl crate::providers::ExecutionContext for Broken {
            fn environment(&self) -> Result<Cow<'_, str>, BoxError> {
                Err(Box::from("dist not resolved"))
            }

            fn current_script(&self) -> Result<Option<String>, BoxError> {
                Ok(None)
            }
        }

        let environment = environment().execution_context(Broken);
        let contributor = Contributor::new("scroll", "2.1.0");

        let mut lines: Vec<String> = vec![];
        let err = ReportBuilder::new(&environment, &contributor)
            .emit(&mut lines)
            .unwrap_err();
        assert_eq!(err.provider(), Provider::ExecutionContext);
        assert!(lines.is_empty());
    }
}
