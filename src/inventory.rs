//! The installed-component inventory shown in every report.
//!
//! Querying the host for its installed components can be expensive, and a
//! report should look the same no matter how often it is produced. The
//! inventory is therefore computed once per [`InventorySnapshot`] and reused
//! for every later report, even if the host's component set changes in the
//! meantime.
//!
//! ```rust
//! use crashprint::{Component, InventorySnapshot, ReportConfig, inventory::StaticInventory};
//!
//! let snapshot = InventorySnapshot::new(
//!     StaticInventory(vec![
//!         Component::new("Scroll", "scroll", "2.1.0"),
//!         Component::new("Lithium", "lithium", "0.14.3"),
//!     ]),
//!     &ReportConfig::DEFAULT,
//! );
//!
//! let lines = snapshot.lines().unwrap();
//! assert_eq!(lines, ["Current Mods:", "  Lithium (lithium) 0.14.3", ""]);
//! ```

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use indexmap::IndexMap;
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    config::ReportConfig,
    providers::{BoxError, Provider, ProviderError},
    snapshot_cell::SnapshotCell,
};

/// One installed host component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    /// Human-readable name.
    pub display_name: String,
    /// Identifier, compared case-insensitively.
    pub id: String,
    /// Installed version.
    pub version: String,
}

impl Component {
    /// Creates a new component entry.
    pub fn new(
        display_name: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            id: id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.display_name, self.id, self.version)
    }
}

/// Lists the components installed in the host.
///
/// Queried at most once per [`InventorySnapshot`], whether or not the query
/// succeeds.
pub trait InventoryProvider: 'static + Send + Sync {
    /// Returns every installed component, in display order.
    fn components(&self) -> Result<Vec<Component>, BoxError>;
}

impl<F> InventoryProvider for F
where
    F: Fn() -> Result<Vec<Component>, BoxError> + 'static + Send + Sync,
{
    fn components(&self) -> Result<Vec<Component>, BoxError> {
        self()
    }
}

/// An [`InventoryProvider`] over a fixed list of components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticInventory(pub Vec<Component>);

impl InventoryProvider for StaticInventory {
    fn components(&self) -> Result<Vec<Component>, BoxError> {
        Ok(self.0.clone())
    }
}

/// Memoized inventory section.
///
/// The snapshot is either *uninitialized* or *populated*. The first call to
/// [`lines`](Self::lines) queries the provider and populates it; every later
/// call returns the same lines without querying again. Concurrent first calls
/// query the provider only once.
///
/// A failing provider still populates the snapshot, with the header and the
/// trailing blank line only. The error is returned to that first call alone.
///
/// The component whose id matches the core runtime id (ignoring ASCII case)
/// is left out, and components with duplicate ids are collapsed into their
/// first occurrence.
pub struct InventorySnapshot {
    provider: Arc<dyn InventoryProvider>,
    excluded_id: &'static str,
    header: &'static str,
    lines: SnapshotCell<Vec<String>>,
}

impl InventorySnapshot {
    /// Creates an uninitialized snapshot over `provider`, headed by
    /// `config.inventory_header` and leaving out `config.core`.
    pub fn new(provider: impl InventoryProvider, config: &ReportConfig) -> Self {
        Self {
            provider: Arc::new(provider).unsize(unsize::Coercion!(to dyn InventoryProvider)),
            excluded_id: config.core.id,
            header: config.inventory_header,
            lines: SnapshotCell::new(),
        }
    }

    /// Returns `true` once the provider has been queried.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.lines.get().is_some()
    }

    /// Returns the inventory section: the header, one line per component and
    /// a trailing blank line.
    pub fn lines(&self) -> Result<&[String], ProviderError> {
        self.lines
            .get_or_populate(|| match self.provider.components() {
                Ok(components) => (self.render(components), None),
                Err(source) => (
                    self.render(Vec::new()),
                    Some(ProviderError::new(Provider::Inventory, source)),
                ),
            })
            .map(Vec::as_slice)
    }

    fn render(&self, components: Vec<Component>) -> Vec<String> {
        let mut unique: IndexMap<String, Component, rustc_hash::FxBuildHasher> =
            IndexMap::default();
        for component in components {
            if component.id.eq_ignore_ascii_case(self.excluded_id) {
                continue;
            }
            unique
                .entry(component.id.to_ascii_lowercase())
                .or_insert(component);
        }

        let mut lines = Vec::with_capacity(unique.len() + 2);
        lines.push(self.header.to_string());
        lines.extend(unique.values().map(|component| alloc::format!("  {component}")));
        lines.push(String::new());
        lines
    }
}

impl fmt::Debug for InventorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventorySnapshot")
            .field("excluded_id", &self.excluded_id)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}
