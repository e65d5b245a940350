//! Key/value edits.
//!
//! Each [`MapEdit`] records the value it replaces, so edits to the same key
//! can be checked for a shared starting point. Concurrent writes of
//! different values resolve to the greater one; removals never merge
//! silently.

use otsync_core::{OtState, OtSystem, PairTransform, StateError, TransformError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Change one key from `prev` to `next`. `None` means absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapEdit<K, V> {
    /// Key being changed
    pub key: K,
    /// Value before the edit
    pub prev: Option<V>,
    /// Value after the edit
    pub next: Option<V>,
}

impl<K, V> MapEdit<K, V> {
    /// Create an edit.
    #[must_use]
    pub fn new(key: K, prev: Option<V>, next: Option<V>) -> Self {
        Self { key, prev, next }
    }

    /// Add a key that was absent.
    #[must_use]
    pub fn insert(key: K, value: V) -> Self {
        Self::new(key, None, Some(value))
    }

    /// Replace an existing value.
    #[must_use]
    pub fn update(key: K, prev: V, next: V) -> Self {
        Self::new(key, Some(prev), Some(next))
    }

    /// Remove a key holding `value`.
    #[must_use]
    pub fn remove(key: K, value: V) -> Self {
        Self::new(key, Some(value), None)
    }
}

impl<K: Clone, V: Clone> MapEdit<K, V> {
    /// The edit that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::new(self.key.clone(), self.next.clone(), self.prev.clone())
    }
}

impl<K: PartialEq, V: PartialEq> MapEdit<K, V> {
    /// Whether the edit leaves the value unchanged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.prev == self.next
    }
}

/// Transform rules for [`MapEdit`].
pub struct MapOtSystem<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MapOtSystem<K, V> {
    /// Create the system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for MapOtSystem<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MapOtSystem<K, V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for MapOtSystem<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapOtSystem")
    }
}

impl<K, V> OtSystem for MapOtSystem<K, V>
where
    K: Ord + Clone + fmt::Debug,
    V: Ord + Clone + fmt::Debug,
{
    type Diff = MapEdit<K, V>;

    fn is_empty(&self, diff: &Self::Diff) -> bool {
        diff.is_noop()
    }

    fn invert(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        diffs.iter().rev().map(MapEdit::inverse).collect()
    }

    /// Edits to distinct keys commute, so the result holds one edit per key
    /// in the order keys were first touched.
    fn squash(&self, diffs: &[Self::Diff]) -> Vec<Self::Diff> {
        let mut slots: BTreeMap<&K, usize> = BTreeMap::new();
        let mut squashed: Vec<Self::Diff> = Vec::new();

        for diff in diffs {
            match slots.get(&diff.key) {
                Some(&slot) => squashed[slot].next.clone_from(&diff.next),
                None => {
                    slots.insert(&diff.key, squashed.len());
                    squashed.push(diff.clone());
                }
            }
        }

        squashed.retain(|diff| !diff.is_noop());
        tracing::debug!(before = diffs.len(), after = squashed.len(), "Squashed map edits");
        squashed
    }

    fn transform_pair(
        &self,
        left: &Self::Diff,
        right: &Self::Diff,
    ) -> Result<PairTransform<Self::Diff>, TransformError> {
        if left.key != right.key {
            return Ok(PairTransform::of(left.clone(), right.clone()));
        }

        if left.prev != right.prev {
            return Err(TransformError::Inconsistent(format!(
                "edits to {:?} start from {:?} and {:?}",
                left.key, left.prev, right.prev
            )));
        }

        let key = &left.key;
        Ok(match (&left.next, &right.next) {
            (None, None) => PairTransform::conflict(format!("both sides remove {key:?}")),
            (None, Some(_)) | (Some(_), None) => {
                PairTransform::conflict(format!("removal of {key:?} races with a write"))
            }
            (Some(l), Some(r)) => match l.cmp(r) {
                Ordering::Equal => PairTransform::empty(),
                Ordering::Greater => {
                    PairTransform::only_left(MapEdit::update(key.clone(), r.clone(), l.clone()))
                }
                Ordering::Less => {
                    PairTransform::only_right(MapEdit::update(key.clone(), l.clone(), r.clone()))
                }
            },
        })
    }
}

/// An ordered map that [`MapEdit`]s apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapState<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K, V> Default for MapState<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> MapState<K, V> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Take the entries.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<K, V> {
        self.entries
    }
}

impl<K, V> From<BTreeMap<K, V>> for MapState<K, V> {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Self { entries }
    }
}

impl<K, V> OtState<MapEdit<K, V>> for MapState<K, V>
where
    K: Ord + Clone + fmt::Debug,
    V: PartialEq + Clone + fmt::Debug,
{
    fn apply(&mut self, edit: &MapEdit<K, V>) -> Result<(), StateError> {
        let current = self.entries.get(&edit.key);
        if current != edit.prev.as_ref() {
            return Err(StateError::Mismatch(format!(
                "{:?} holds {:?}, edit expects {:?}",
                edit.key, current, edit.prev
            )));
        }

        match &edit.next {
            Some(value) => {
                self.entries.insert(edit.key.clone(), value.clone());
            }
            None => {
                self.entries.remove(&edit.key);
            }
        }
        Ok(())
    }
}
