use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::{AbstractValue, HasBottom, Lattice};

/// Finite-map abstract domain: unique keys, values drawn from a lattice.
///
/// A key absent from the map is semantically bound to the value domain's
/// bottom, so `join` is key union with pointwise value join and
/// `is_subseteq` is key containment with pointwise ordering. Iteration
/// order carries no meaning.
#[derive(Debug, Clone)]
pub struct MapDomain<K, V> {
    entries: FxHashMap<K, V>,
}

// Derived `PartialEq` would only require `K: PartialEq`, but comparing
// the inner hash maps needs the full key bounds.
impl<K: Eq + Hash, V: PartialEq> PartialEq for MapDomain<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> Default for MapDomain<K, V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> MapDomain<K, V> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Classify as exactly-one-entry vs. anything else.
    pub fn as_singleton(&self) -> Option<(&K, &V)> {
        if self.entries.len() == 1 {
            self.entries.iter().next()
        } else {
            None
        }
    }

    /// Bind `key` to `value`, replacing any previous binding.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> MapDomain<K, V> {
    pub fn singleton(key: K, value: V) -> Self {
        let mut map = Self::empty();
        map.insert(key, value);
        map
    }

    /// Rebuild the map with `f` applied to every value, keys unchanged.
    pub fn map_values(&self, f: impl Fn(&V) -> V) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Lattice + Clone> MapDomain<K, V> {
    /// Bind `key` to `value`, joining with any previous binding.
    pub fn insert_join(&mut self, key: K, value: V) {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                let joined = e.get().join(&value);
                *e.get_mut() = joined;
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(value);
            }
        }
    }
}

impl<K: Eq + Hash + Clone, V: Lattice + Clone> Lattice for MapDomain<K, V> {
    fn join(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (k, v) in &other.entries {
            out.insert_join(k.clone(), v.clone());
        }
        out
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.entries
            .iter()
            .all(|(k, v)| other.get(k).is_some_and(|w| v.is_subseteq(w)))
    }
}

impl<K: Eq + Hash + Clone, V: Lattice + Clone> HasBottom for MapDomain<K, V> {
    fn bottom() -> Self {
        Self::empty()
    }
}

impl<K: Eq + Hash + Clone, V: AbstractValue + Clone> AbstractValue for MapDomain<K, V> {
    fn widen(&self, next: &Self, iters: usize) -> Self {
        let mut out = self.clone();
        for (k, v) in &next.entries {
            match out.entries.entry(k.clone()) {
                std::collections::hash_map::Entry::Occupied(mut e) => {
                    let widened = e.get().widen(v, iters);
                    *e.get_mut() = widened;
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(v.clone());
                }
            }
        }
        out
    }
}
