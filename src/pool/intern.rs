use std::hash::Hash;

use indexmap::IndexMap;

/// A map from structural keys to the index each key was first assigned. Once a key has been
/// entered its index never changes, and iteration yields keys in the order they were entered.
#[derive(Clone, Debug)]
pub struct InternTable<K: Eq + Hash> {
    indices: IndexMap<K, u16>,
}

impl<K: Eq + Hash> Default for InternTable<K> {
    fn default() -> Self {
        Self {
            indices: IndexMap::new(),
        }
    }
}

impl<K: Eq + Hash> InternTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: IndexMap::with_capacity(capacity),
        }
    }

    /// Get the index `key` was entered with, if it has been entered.
    pub fn lookup(&self, key: &K) -> Option<u16> {
        self.indices.get(key).copied()
    }

    /// Record that `key` lives at `index` and return the index `key` is now associated with. If
    /// `key` was already present its original index is kept and returned.
    pub fn enter(&mut self, key: K, index: u16) -> u16 {
        *self.indices.entry(key).or_insert(index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Every entered key with its index, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u16)> + '_ {
        self.indices.iter().map(|(key, &index)| (key, index))
    }
}
