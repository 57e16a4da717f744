//! The collaborators shared by every report of one host.

use core::fmt;

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    config::ReportConfig,
    inventory::{InventoryProvider, InventorySnapshot},
    providers::{ExecutionContext, StaticContext, VersionProvider},
    traced::{CallerLocation, StackCapture},
};

/// Everything a [`ReportBuilder`](crate::ReportBuilder) needs besides the
/// failure itself.
///
/// Construct one `Environment` per host and hand a reference to every
/// builder. It owns the [`InventorySnapshot`], so all reports built from the
/// same environment print the same inventory.
///
/// # Examples
///
/// ```rust
/// use crashprint::{
///     Environment, StaticContext, VersionInfo,
///     inventory::StaticInventory,
/// };
///
/// let environment = Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"))
///     .execution_context(StaticContext {
///         environment: "DEDICATED_SERVER".into(),
///     });
///
/// assert!(!environment.inventory().is_populated());
/// ```
pub struct Environment {
    config: ReportConfig,
    inventory: InventorySnapshot,
    versions: Arc<dyn VersionProvider>,
    context: Arc<dyn ExecutionContext>,
    stack: Arc<dyn StackCapture>,
}

impl Environment {
    /// Creates an environment with [`ReportConfig::DEFAULT`].
    ///
    /// The execution context defaults to [`StaticContext::UNKNOWN`] and stack
    /// capture to [`CallerLocation`].
    pub fn new(inventory: impl InventoryProvider, versions: impl VersionProvider) -> Self {
        Self::with_config(ReportConfig::DEFAULT, inventory, versions)
    }

    /// Creates an environment with a custom configuration.
    ///
    /// The inventory leaves out the component of `config.core`.
    pub fn with_config(
        config: ReportConfig,
        inventory: impl InventoryProvider,
        versions: impl VersionProvider,
    ) -> Self {
        Self {
            config,
            inventory: InventorySnapshot::new(inventory, &config),
            versions: Arc::new(versions).unsize(unsize::Coercion!(to dyn VersionProvider)),
            context: Arc::new(StaticContext::UNKNOWN)
                .unsize(unsize::Coercion!(to dyn ExecutionContext)),
            stack: Arc::new(CallerLocation).unsize(unsize::Coercion!(to dyn StackCapture)),
        }
    }

    /// Sets the execution context queried for the environment classification
    /// and the current script.
    #[must_use]
    pub fn execution_context(mut self, context: impl ExecutionContext) -> Self {
        self.context = Arc::new(context).unsize(unsize::Coercion!(to dyn ExecutionContext));
        self
    }

    /// Sets how the current stack is captured when a failure carries no
    /// frames of its own.
    #[must_use]
    pub fn stack_capture(mut self, stack: impl StackCapture) -> Self {
        self.stack = Arc::new(stack).unsize(unsize::Coercion!(to dyn StackCapture));
        self
    }

    /// The report configuration.
    #[must_use]
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// The memoized inventory.
    #[must_use]
    pub fn inventory(&self) -> &InventorySnapshot {
        &self.inventory
    }

    /// The version provider.
    #[must_use]
    pub fn versions(&self) -> &dyn VersionProvider {
        &*self.versions
    }

    /// The execution context.
    #[must_use]
    pub fn context(&self) -> &dyn ExecutionContext {
        &*self.context
    }

    /// The stack capture.
    #[must_use]
    pub fn stack(&self) -> &dyn StackCapture {
        &*self.stack
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("inventory", &self.inventory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{
        config::CoreRuntime,
        inventory::{Component, StaticInventory},
        providers::VersionInfo,
    };

    #[test]
    fn test_custom_core_is_excluded_from_inventory() {
        let config = ReportConfig {
            core: CoreRuntime {
                id: "quill",
                display_name: "Quill",
                default_report_url: "https://example.org/quill/issues",
            },
            ..ReportConfig::DEFAULT
        };
        let environment = Environment::with_config(
            config,
            StaticInventory(vec![
                Component::new("Scroll", "scroll", "2.1.0"),
                Component::new("Quill", "QUILL", "0.3.0"),
            ]),
            VersionInfo::unknown("0.3.0"),
        );

        let lines = environment.inventory().lines().unwrap();
        assert_eq!(lines, ["Current Mods:", "  Scroll (scroll) 2.1.0", ""]);
    }

    #[test]
    fn test_environment_send_sync() {
        static_assertions::assert_impl_all!(Environment: Send, Sync);
    }
}
