//! Severe-error reports written through `tracing`.
//!
//! This example loads a few scripts inside `#[instrument]`ed functions. When
//! one of them fails, the report is logged through [`TracingSink`] and its
//! "Current script" line is read from the enclosing span.
//!
//! If you currently use `tracing_subscriber::fmt::init()`, this shows how to
//! expand that setup to add `ScriptLayer`.

use crashprint::{
    AlreadyReported, Component, Contributor, Environment, LanguageRuntime, OsInfo, ReportBuilder,
    StaticInventory, TracedError, VersionInfo,
};
use crashprint_tracing::{ScriptLayer, SpanScriptProbe, TracingSink};
use tracing::instrument;
use tracing_subscriber::{Registry, layer::SubscriberExt};

// Simple error types for this example
#[derive(Debug, thiserror::Error)]
#[error("unknown effect '{0}'")]
struct UnknownEffect(String);

#[derive(Debug, thiserror::Error)]
#[error("failed to compile {script}")]
struct CompileError {
    script: String,
    #[source]
    source: TracedError,
}

fn compile_line(line: &str) -> Result<(), TracedError> {
    if let Some(effect) = line.strip_prefix("explode ") {
        return Err(TracedError::new("could not parse line")
            .with_source(UnknownEffect(effect.to_string())));
    }
    Ok(())
}

#[instrument(skip(source))]
fn compile(script: &str, source: &str) -> Result<(), CompileError> {
    for line in source.lines() {
        compile_line(line).map_err(|source| CompileError {
            script: script.to_string(),
            source,
        })?;
    }
    Ok(())
}

#[instrument(skip_all, fields(script = name))]
fn load_script(
    environment: &Environment,
    addon: &Contributor,
    name: &str,
    source: &str,
) -> Result<(), AlreadyReported> {
    let Err(failure) = compile(name, source) else {
        return Ok(());
    };

    let outcome = ReportBuilder::new(environment, addon)
        .error(&failure)
        .message(format!("Script {name} could not be loaded"))
        .emit(&mut TracingSink::new())
        .map_err(|_| AlreadyReported)?;
    Err(outcome.into())
}

fn main() {
    // Set up tracing subscriber with ScriptLayer
    // This replaces `tracing_subscriber::fmt::init()` to add script capture
    let subscriber = Registry::default()
        .with(ScriptLayer)
        .with(tracing_subscriber::fmt::layer());

    tracing::subscriber::set_global_default(subscriber).expect("failed to set default subscriber");

    let environment = Environment::new(
        StaticInventory(vec![
            Component::new("Scroll", "scroll", "2.1.0"),
            Component::new("Lithium", "lithium", "0.14.3"),
        ]),
        VersionInfo {
            language: LanguageRuntime::current(),
            os: OsInfo::current(),
            ..VersionInfo::unknown("2.1.0")
        },
    )
    .execution_context(SpanScriptProbe::new("DEDICATED_SERVER"));
    let addon = Contributor::new("boom-addon", "0.2.0");

    let scripts = [
        ("farm.sk", "on tick\nbroadcast \"hi\""),
        ("mobs.sk", "on spawn\nexplode creeper"),
    ];
    for (name, source) in scripts {
        match load_script(&environment, &addon, name, source) {
            Ok(()) => tracing::info!("loaded {name}"),
            Err(AlreadyReported) => tracing::warn!("skipped {name}, see the report above"),
        }
    }
}
