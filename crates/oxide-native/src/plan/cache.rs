//! Compute-if-absent map with at most one concurrent build per key.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// A concurrent map whose values are built on first use.
///
/// Callers asking for a key that is being built wait for that build instead
/// of starting their own. A failed build leaves no entry behind.
#[derive(Debug)]
pub struct ComputeCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Arc<Mutex<Option<V>>>>,
}

impl<K, V> Default for ComputeCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V> ComputeCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, building it with `build` if absent.
    ///
    /// # Errors
    ///
    /// Returns the error of `build`; nothing is stored in that case.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        // the shard lock is released before building
        let slot = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        );

        let mut guard = slot.lock();
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        match build() {
            Ok(value) => {
                *guard = Some(value.clone());
                Ok(value)
            }
            Err(error) => {
                drop(guard);
                self.entries.remove_if(&key, |_, current| {
                    Arc::ptr_eq(current, &slot) && current.try_lock().is_some_and(|g| g.is_none())
                });
                Err(error)
            }
        }
    }

    /// The built value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = Arc::clone(self.entries.get(key)?.value());
        let guard = slot.lock();
        guard.clone()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let (_, slot) = self.entries.remove(key)?;
        let value = slot.lock().take();
        value
    }

    /// Number of keys, builds in progress included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
