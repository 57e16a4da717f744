//! Integration tests for report composition.
//!
//! ## Layout
//! - `test_nightly_core_failure_full_report`: the complete report for a
//!   failing nightly core runtime, line by line
//! - `test_stable_core_failure_guidance` and
//!   `test_contributor_failure_has_no_guidance`: guidance selection
//! - `test_empty_report_url_uses_default`: URL fallback
//!
//! ## Sentinel
//! - `test_sentinel_writes_nothing`, `test_boxed_sentinel_writes_nothing`
//! - `test_outcome_propagates_as_sentinel`
//!
//! ## Cause Chains
//! - `test_absent_error_synthesizes_entry`
//! - `test_foreign_error_chain`: `thiserror` and `derive_more` errors mixed
//!   with traced ones
//! - `test_newtype_wrapper_keeps_root_cause`
//!
//! ## Providers
//! - `test_inventory_is_computed_once`
//! - `test_concurrent_reports_share_one_inventory`
//! - `test_version_provider_failure_writes_nothing`
//! - `test_inventory_failure_is_not_retried`
//! - `test_current_platform_version_lines` (`std` only)

use std::{
    borrow::Cow,
    error::Error,
    panic::Location,
    sync::{
        Barrier,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use crashprint::{
    AlreadyReported, BoxError, Component, Contributor, Environment, ExecutionContext,
    InventoryProvider, LanguageRuntime, NamedVersion, OsInfo, Outcome, Provider, ReportBuilder,
    StackCapture, StackFrame, StaticContext, StaticInventory, TracedError, VersionInfo,
};

struct ServerContext;

impl ExecutionContext for ServerContext {
    fn environment(&self) -> Result<Cow<'_, str>, BoxError> {
        Ok(Cow::Borrowed("DEDICATED_SERVER"))
    }

    fn current_script(&self) -> Result<Option<String>, BoxError> {
        Ok(Some("farm.sk".to_string()))
    }
}

struct FixedStack;

impl StackCapture for FixedStack {
    fn capture(&self, _caller: &'static Location<'static>) -> Vec<StackFrame> {
        vec![
            StackFrame::function("scroll::log::report_failure").at("src/log.rs", 30),
            StackFrame::function("scroll::runtime::Scheduler::tick")
                .at("src/runtime/scheduler.rs", 44),
        ]
    }
}

fn versions(runtime: &str) -> VersionInfo {
    VersionInfo {
        runtime: runtime.to_string(),
        host: NamedVersion::new("NeoForge", "21.1.72"),
        platform: NamedVersion::new("Minecraft", "1.21.1"),
        language: LanguageRuntime {
            name: "Rust".into(),
            version: "1.89.0".to_string(),
            vendor: "rust-lang".to_string(),
            vm: "x86_64-unknown-linux-gnu".to_string(),
        },
        os: OsInfo {
            name: "linux".to_string(),
            arch: "x86_64".to_string(),
            version: "6.8.0".to_string(),
        },
    }
}

fn server(runtime: &str) -> Environment {
    Environment::new(
        StaticInventory(vec![
            Component::new("Scroll", "scroll", runtime),
            Component::new("Lithium", "lithium", "0.14.3"),
        ]),
        versions(runtime),
    )
    .execution_context(ServerContext)
    .stack_capture(FixedStack)
}

fn emit(builder: &ReportBuilder<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let outcome = builder.emit(&mut lines).unwrap();
    assert_eq!(outcome, Outcome::Reported);
    lines
}

#[test]
fn test_nightly_core_failure_full_report() {
    let environment = server("2.1.0-nightly");
    let scroll = Contributor::new("scroll", "2.1.0-nightly");
    let failure = TracedError::without_frames("trigger 'on tick' failed")
        .with_frames(vec![
            StackFrame::function("scroll::runtime::Trigger::run").at("src/runtime/trigger.rs", 88),
            StackFrame::function("scroll::runtime::Scheduler::tick")
                .at("src/runtime/scheduler.rs", 41),
        ])
        .with_source(TracedError::without_frames("division by zero").with_frames(vec![
            StackFrame::function("scroll::expr::Divide::eval").at("src/expr/arith.rs", 17),
        ]));

    let lines = emit(
        &ReportBuilder::new(&environment, &scroll)
            .error(&failure)
            .message("Failed to run trigger 'on tick'"),
    );

    let expected = [
        "#!#! ",
        "#!#! [scroll] Severe Error:",
        "#!#! Failed to run trigger 'on tick'",
        "#!#! ",
        "#!#! Current Mods:",
        "#!#!   Lithium (lithium) 0.14.3",
        "#!#! ",
        "#!#! You're running a (buggy) nightly version of Scroll.",
        "#!#! If this is not a test server, switch to a more stable release NOW!",
        "#!#! Your players are unlikely to appreciate crashes and/or data loss due to Scroll bugs.",
        "#!#! ",
        "#!#! Just testing things? Good. Please report this bug, so that we can fix it before a stable release.",
        "#!#! Issue tracker: https://github.com/ScrollLang/Scroll/issues",
        "#!#! ",
        "#!#! Stack trace:",
        "#!#! trigger 'on tick' failed",
        "#!#!     at scroll::runtime::Trigger::run (src/runtime/trigger.rs:88)",
        "#!#!     at scroll::runtime::Scheduler::tick (src/runtime/scheduler.rs:41)",
        "#!#! Caused by: division by zero",
        "#!#!     at scroll::expr::Divide::eval (src/expr/arith.rs:17)",
        "#!#! ",
        "#!#! Version Information:",
        "#!#!   Scroll: 2.1.0-nightly",
        "#!#!   NeoForge: 21.1.72",
        "#!#!   Minecraft: 1.21.1",
        "#!#!   Rust: 1.89.0 rust-lang x86_64-unknown-linux-gnu",
        "#!#!   OS: linux x86_64 6.8.0",
        "#!#! ",
        "#!#! Environment: DEDICATED_SERVER",
        "#!#! ",
        "#!#! Current script: farm.sk",
        "#!#! ",
        "#!#! End of Error.",
        "#!#! ",
    ];
    assert_eq!(lines, expected);
}

#[test]
fn test_stable_core_failure_guidance() {
    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");

    let lines = emit(&ReportBuilder::new(&environment, &scroll));
    let start = lines
        .iter()
        .position(|line| line == "#!#! Something went horribly wrong with Scroll.")
        .unwrap();
    assert_eq!(
        lines[start..start + 5],
        [
            "#!#! Something went horribly wrong with Scroll.",
            "#!#! This issue is NOT your fault! You probably can't fix it yourself, either.",
            "#!#! You should report it at https://github.com/ScrollLang/Scroll/issues. Please copy paste this report there (or use a paste service).",
            "#!#! This ensures that your issue is noticed and will be fixed as soon as possible.",
            "#!#! ",
        ]
    );
    assert!(!lines.iter().any(|line| line.contains("nightly version")));
}

#[test]
fn test_contributor_failure_has_no_guidance() {
    let environment = server("2.1.0-nightly");
    let addon = Contributor::new("sculk-addon", "0.9.0-nightly");

    let lines = emit(&ReportBuilder::new(&environment, &addon));
    assert_eq!(lines[1], "#!#! [sculk-addon] Severe Error:");
    assert!(!lines.iter().any(|line| line.contains("nightly version")));
    assert!(!lines.iter().any(|line| line.contains("horribly wrong")));

    let versions = lines
        .iter()
        .position(|line| line == "#!#! Version Information:")
        .unwrap();
    assert_eq!(lines[versions + 1], "#!#!   Scroll: 2.1.0-nightly");
    assert_eq!(lines[versions + 2], "#!#!   sculk-addon: 0.9.0-nightly");
    assert_eq!(lines[versions + 3], "#!#!   NeoForge: 21.1.72");
}

#[test]
fn test_empty_report_url_uses_default() {
    let environment = server("2.1.0-nightly");
    let scroll = Contributor::new("scroll", "2.1.0-nightly").with_report_url("");

    let tracker = |lines: &[String]| {
        lines
            .iter()
            .find_map(|line| line.strip_prefix("#!#! Issue tracker: "))
            .map(str::to_owned)
    };

    let lines = emit(&ReportBuilder::new(&environment, &scroll));
    assert_eq!(
        tracker(&lines).as_deref(),
        Some("https://github.com/ScrollLang/Scroll/issues")
    );

    let scroll = scroll.with_report_url("https://example.org/scroll/issues");
    let lines = emit(&ReportBuilder::new(&environment, &scroll));
    assert_eq!(
        tracker(&lines).as_deref(),
        Some("https://example.org/scroll/issues")
    );
}

#[test]
fn test_sentinel_writes_nothing() {
    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");

    let mut lines: Vec<String> = Vec::new();
    let outcome = ReportBuilder::new(&environment, &scroll)
        .error(&AlreadyReported)
        .message("should never be printed")
        .emit(&mut lines)
        .unwrap();

    assert_eq!(outcome, Outcome::AlreadyReported);
    assert!(!outcome.is_fresh());
    assert!(lines.is_empty());
}

#[test]
fn test_boxed_sentinel_writes_nothing() {
    fn load_script() -> Result<(), Box<dyn Error + Send + Sync>> {
        Err(AlreadyReported)?
    }

    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");
    let err = load_script().unwrap_err();

    let mut lines: Vec<String> = Vec::new();
    let outcome = ReportBuilder::new(&environment, &scroll)
        .error(&*err)
        .emit(&mut lines)
        .unwrap();
    assert_eq!(outcome, Outcome::AlreadyReported);
    assert!(lines.is_empty());
}

#[test]
fn test_outcome_propagates_as_sentinel() {
    fn run_trigger(environment: &Environment, scroll: &Contributor) -> Result<(), BoxError> {
        let failure = TracedError::new("trigger failed");
        let mut lines: Vec<String> = Vec::new();
        let outcome = ReportBuilder::new(environment, scroll)
            .error(&failure)
            .emit(&mut lines)?;
        Err(AlreadyReported::from(outcome).into())
    }

    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");
    let err = run_trigger(&environment, &scroll).unwrap_err();

    let mut lines: Vec<String> = Vec::new();
    let outcome = ReportBuilder::new(&environment, &scroll)
        .error(&*err)
        .emit(&mut lines)
        .unwrap();
    assert_eq!(outcome, Outcome::AlreadyReported);
    assert!(lines.is_empty());
}

#[test]
fn test_absent_error_synthesizes_entry() {
    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");

    let lines = emit(&ReportBuilder::new(&environment, &scroll));
    let start = lines
        .iter()
        .position(|line| line == "#!#! Stack trace:")
        .unwrap();
    assert_eq!(
        lines[start + 1..start + 6],
        [
            "#!#!   warning: no/empty exception given, dumping current stack trace instead",
            "#!#! no error given",
            "#!#!     at scroll::log::report_failure (src/log.rs:30)",
            "#!#!     at scroll::runtime::Scheduler::tick (src/runtime/scheduler.rs:44)",
            "#!#! ",
        ]
    );
    assert!(!lines.iter().any(|line| line.contains("Caused by:")));
}

#[derive(Debug, thiserror::Error)]
enum ScriptError {
    #[error("failed to load script {name}")]
    Load {
        name: &'static str,
        #[source]
        source: TracedError,
    },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unknown effect")]
struct UnknownEffect;

#[test]
fn test_foreign_error_chain() {
    let environment = server("2.1.0");
    let addon = Contributor::new("sculk-addon", "1.4.0");
    let failure = ScriptError::Load {
        name: "farm.sk",
        source: TracedError::without_frames("could not parse line 3")
            .with_frames(vec![
                StackFrame::function("scroll::parser::parse_line").at("src/parser.rs", 210),
            ])
            .with_source(UnknownEffect),
    };

    let lines = emit(&ReportBuilder::new(&environment, &addon).error(&failure));
    let start = lines
        .iter()
        .position(|line| line == "#!#! Stack trace:")
        .unwrap();
    let end = lines
        .iter()
        .position(|line| line == "#!#! Version Information:")
        .unwrap();
    assert_eq!(
        lines[start + 1..end - 1],
        [
            "#!#!   warning: no/empty exception given, dumping current stack trace instead",
            "#!#! failed to load script farm.sk",
            "#!#!     at scroll::log::report_failure (src/log.rs:30)",
            "#!#!     at scroll::runtime::Scheduler::tick (src/runtime/scheduler.rs:44)",
            "#!#! Caused by: failed to load script farm.sk",
            "#!#! Caused by: could not parse line 3",
            "#!#!     at scroll::parser::parse_line (src/parser.rs:210)",
            "#!#! Caused by: unknown effect",
        ]
    );
}

struct CountingInventory {
    calls: &'static AtomicUsize,
    fail_first: bool,
}

impl InventoryProvider for CountingInventory {
    fn components(&self) -> Result<Vec<Component>, BoxError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && call == 0 {
            return Err("mod list is still loading".into());
        }
        // Every call would see a different mod list.
        Ok(vec![Component::new("Iris", "iris", format!("1.8.{call}"))])
    }
}

fn inventory_section(lines: &[String]) -> &[String] {
    let start = lines
        .iter()
        .position(|line| line == "#!#! Current Mods:")
        .unwrap();
    let end = start + lines[start..].iter().position(|line| line == "#!#! ").unwrap();
    &lines[start..=end]
}

#[test]
fn test_inventory_is_computed_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let environment = Environment::new(
        CountingInventory {
            calls: &CALLS,
            fail_first: false,
        },
        versions("2.1.0"),
    );
    let scroll = Contributor::new("scroll", "2.1.0");
    let addon = Contributor::new("sculk-addon", "1.4.0");

    let first = emit(&ReportBuilder::new(&environment, &scroll));
    let second = emit(&ReportBuilder::new(&environment, &addon).message("second failure"));

    assert_eq!(inventory_section(&first), inventory_section(&second));
    assert_eq!(
        inventory_section(&first),
        ["#!#! Current Mods:", "#!#!   Iris (iris) 1.8.0", "#!#! "]
    );
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_version_provider_failure_writes_nothing() {
    let versions =
        || -> Result<VersionInfo, BoxError> { Err("loader metadata unavailable".into()) };
    let environment = Environment::new(StaticInventory::default(), versions);
    let scroll = Contributor::new("scroll", "2.1.0");

    let mut lines: Vec<String> = Vec::new();
    let err = ReportBuilder::new(&environment, &scroll)
        .emit(&mut lines)
        .unwrap_err();

    assert_eq!(err.provider(), Provider::Version);
    assert_eq!(err.to_string(), "the version provider failed");
    assert_eq!(
        err.source().map(ToString::to_string).as_deref(),
        Some("loader metadata unavailable")
    );
    assert!(lines.is_empty());
}

#[test]
fn test_inventory_failure_is_not_retried() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let environment = Environment::new(
        CountingInventory {
            calls: &CALLS,
            fail_first: true,
        },
        versions("2.1.0"),
    )
    .execution_context(StaticContext::UNKNOWN);
    let scroll = Contributor::new("scroll", "2.1.0");

    let mut lines: Vec<String> = Vec::new();
    let err = ReportBuilder::new(&environment, &scroll)
        .emit(&mut lines)
        .unwrap_err();
    assert_eq!(err.provider(), Provider::Inventory);
    assert!(lines.is_empty());
    assert!(environment.inventory().is_populated());

    let lines = emit(&ReportBuilder::new(&environment, &scroll));
    assert_eq!(inventory_section(&lines), ["#!#! Current Mods:", "#!#! "]);
    assert!(lines.contains(&"#!#! Environment: unknown".to_string()));
    assert!(lines.contains(&"#!#! Current script: null".to_string()));

    let again = emit(&ReportBuilder::new(&environment, &scroll));
    assert_eq!(inventory_section(&again), inventory_section(&lines));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_reports_share_one_inventory() {
    const THREADS: usize = 6;
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let environment = &Environment::new(
        CountingInventory {
            calls: &CALLS,
            fail_first: false,
        },
        versions("2.1.0"),
    );
    let barrier = &Barrier::new(THREADS);

    let reports: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|index| {
                scope.spawn(move || {
                    let addon = Contributor::new(format!("addon-{index}"), "1.0.0");
                    barrier.wait();
                    emit(&ReportBuilder::new(environment, &addon))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    for lines in &reports {
        assert_eq!(
            inventory_section(lines),
            ["#!#! Current Mods:", "#!#!   Iris (iris) 1.8.0", "#!#! "]
        );
    }
}

#[derive(Debug, thiserror::Error)]
#[error("script rejected")]
struct Rejected(#[source] TracedError);

#[test]
fn test_newtype_wrapper_keeps_root_cause() {
    let environment = server("2.1.0");
    let scroll = Contributor::new("scroll", "2.1.0");
    let failure = Rejected(
        TracedError::without_frames("division by zero")
            .with_frames(vec![StackFrame::function("scroll::expr::eval").at("src/expr.rs", 17)]),
    );

    let lines = emit(&ReportBuilder::new(&environment, &scroll).error(&failure));
    let start = lines
        .iter()
        .position(|line| line == "#!#! Stack trace:")
        .unwrap();
    let end = lines
        .iter()
        .position(|line| line == "#!#! Version Information:")
        .unwrap();
    assert_eq!(
        lines[start + 1..end - 1],
        [
            "#!#!   warning: no/empty exception given, dumping current stack trace instead",
            "#!#! script rejected",
            "#!#!     at scroll::log::report_failure (src/log.rs:30)",
            "#!#!     at scroll::runtime::Scheduler::tick (src/runtime/scheduler.rs:44)",
            "#!#! Caused by: script rejected",
            "#!#! Caused by: division by zero",
            "#!#!     at scroll::expr::eval (src/expr.rs:17)",
        ]
    );
}

#[cfg(feature = "std")]
#[test]
fn test_current_platform_version_lines() {
    let environment = Environment::new(
        StaticInventory::default(),
        VersionInfo {
            language: LanguageRuntime::current(),
            os: OsInfo::current(),
            ..VersionInfo::unknown("2.1.0")
        },
    );
    let scroll = Contributor::new("scroll", "2.1.0");
    let lines = emit(&ReportBuilder::new(&environment, &scroll));

    let language = LanguageRuntime::current();
    let rust = format!(
        "#!#!   Rust: {} rust-lang {}",
        language.version, language.vm
    );
    assert!(lines.contains(&rust), "{lines:#?}");

    let os_prefix = format!(
        "#!#!   OS: {} {} ",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    assert!(lines.iter().any(|line| line.starts_with(&os_prefix)), "{lines:#?}");
}

#[test]
fn test_shared_types_are_thread_safe() {
    static_assertions::assert_impl_all!(Environment: Send, Sync);
    static_assertions::assert_impl_all!(TracedError: Send, Sync, Error);
    static_assertions::assert_impl_all!(AlreadyReported: Send, Sync, Copy, Error);
}
