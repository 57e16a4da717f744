#[cfg(feature = "std")]
use std::sync::OnceLock;

/// A write-once cell populated by its first caller.
///
/// Concurrent first callers are serialized and the initializer runs exactly
/// once. The initializer always produces a value; it may hand back an error
/// along with it, which only the populating caller sees.
pub(crate) struct SnapshotCell<T: Send + Sync> {
    #[cfg(feature = "std")]
    value: OnceLock<T>,

    #[cfg(not(feature = "std"))]
    value: spin::Once<T>,
}

impl<T: Send + Sync> SnapshotCell<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(feature = "std")]
            value: OnceLock::new(),

            #[cfg(not(feature = "std"))]
            value: spin::Once::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns the stored value, populating the cell with `f` if empty.
    ///
    /// If `f` reports an error, the value it returned is stored anyway and the
    /// error is returned to this caller only. Later callers get the value.
    pub(crate) fn get_or_populate<E>(&self, f: impl FnOnce() -> (T, Option<E>)) -> Result<&T, E> {
        let mut error = None;
        let init = || {
            let (value, failure) = f();
            error = failure;
            value
        };

        #[cfg(feature = "std")]
        let value = self.value.get_or_init(init);
        #[cfg(not(feature = "std"))]
        let value = self.value.call_once(init);

        match error {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }
}

impl<T: Send + Sync> core::fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("populated", &self.get().is_some())
            .finish()
    }
}
