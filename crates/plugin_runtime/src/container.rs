//! Sorted associative containers.
//!
//! [`SortedVec`] keeps its entries in one contiguous vector ordered by key and
//! answers lookups with a binary search. [`HashedVec`] layers string keys on top
//! of it: each slot is keyed by the hash of the string and holds a chain of
//! `(key, value)` links, so distinct strings that hash to the same value still
//! coexist.

use smallvec::SmallVec;

use crate::utils::hash_str;

/// Hash-ordered vector of key/value pairs.
#[derive(Debug, Clone)]
pub struct SortedVec<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for SortedVec<K, V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Ord + Copy, V> SortedVec<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first entry whose key is not less than `key`.
    fn lower_bound(&self, key: K) -> usize {
        self.entries.partition_point(|(k, _)| *k < key)
    }

    fn position(&self, key: K) -> Option<usize> {
        let index = self.lower_bound(key);
        match self.entries.get(index) {
            Some((k, _)) if *k == key => Some(index),
            _ => None,
        }
    }

    /// Inserts a new entry. An existing key is left untouched and the
    /// rejected value is handed back.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), V> {
        let index = self.lower_bound(key);
        if matches!(self.entries.get(index), Some((k, _)) if *k == key) {
            return Err(value);
        }
        self.entries.insert(index, (key, value));
        Ok(())
    }

    /// Inserts or replaces, returning the previous value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        match self.position(key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                let index = self.lower_bound(key);
                self.entries.insert(index, (key, value));
                None
            }
        }
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.position(key).map(move |index| &mut self.entries[index].1)
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.position(key).is_some()
    }

    /// Removes an entry, shifting later entries down.
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.position(key).map(|index| self.entries.remove(index).1)
    }

    /// Removes the first entry holding `value` and returns its key.
    pub fn remove_value(&mut self, value: &V) -> Option<K>
    where
        V: PartialEq,
    {
        let index = self.entries.iter().position(|(_, v)| v == value)?;
        Some(self.entries.remove(index).0)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(K, &mut V) -> bool) {
        self.entries.retain_mut(|(k, v)| keep(*k, v));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> SortedVec<u32, V> {
    /// Smallest key that is not currently in use.
    pub fn find_unused_key(&self) -> u32 {
        let mut candidate = 0u32;
        for (key, _) in &self.entries {
            if *key != candidate {
                break;
            }
            candidate = candidate.wrapping_add(1);
        }
        candidate
    }
}

/// Chain of same-hash links held by one slot.
type Chain<V> = SmallVec<[(String, V); 1]>;

/// String-keyed container ordered by key hash, with collision chains.
#[derive(Debug, Clone)]
pub struct HashedVec<V> {
    slots: SortedVec<u32, Chain<V>>,
    hasher: fn(&str) -> u32,
    len: usize,
}

impl<V> Default for HashedVec<V> {
    fn default() -> Self {
        Self::with_hasher(hash_str)
    }
}

impl<V> HashedVec<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container that hashes keys with `hasher` instead of the
    /// default one-at-a-time hash.
    pub fn with_hasher(hasher: fn(&str) -> u32) -> Self {
        Self {
            slots: SortedVec::new(),
            hasher,
            len: 0,
        }
    }

    pub fn hash_key(&self, key: &str) -> u32 {
        (self.hasher)(key)
    }

    /// Inserts a new link. A key that is already present, including one that
    /// only shares its hash with an existing key, is compared as a string.
    pub fn insert(&mut self, key: &str, value: V) -> Result<(), V> {
        let hash = self.hash_key(key);
        match self.slots.get_mut(hash) {
            Some(chain) => {
                if chain.iter().any(|(k, _)| k == key) {
                    return Err(value);
                }
                chain.push((key.to_string(), value));
            }
            None => {
                let mut chain = Chain::new();
                chain.push((key.to_string(), value));
                // The slot is known to be vacant here.
                let _ = self.slots.insert(hash, chain);
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        if let Some(existing) = self.get_mut(key) {
            return Some(std::mem::replace(existing, value));
        }
        // Cannot collide: the key was just looked up.
        let _ = self.insert(key, value);
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.slots
            .get(self.hash_key(key))?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let hash = self.hash_key(key);
        self.slots
            .get_mut(hash)?
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes one link. When it was the first link of its slot, the next link
    /// takes its place; a slot whose chain runs empty is dropped.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let hash = self.hash_key(key);
        let chain = self.slots.get_mut(hash)?;
        let index = chain.iter().position(|(k, _)| k == key)?;
        let (_, value) = chain.remove(index);
        if chain.is_empty() {
            self.slots.remove(hash);
        }
        self.len -= 1;
        Some(value)
    }

    /// Reverse lookup: the key under which `value` is stored.
    pub fn find_key(&self, value: &V) -> Option<&str>
    where
        V: PartialEq,
    {
        self.iter().find(|(_, v)| *v == value).map(|(k, _)| k)
    }

    /// Removes the first link holding `value`, returning its key.
    pub fn remove_value(&mut self, value: &V) -> Option<String>
    where
        V: PartialEq,
    {
        let key = self.find_key(value)?.to_string();
        self.remove(&key);
        Some(key)
    }

    /// Any one stored value, if the container is not empty.
    pub fn get_any(&self) -> Option<&V> {
        self.slots.values().next().and_then(|chain| chain.first()).map(|(_, v)| v)
    }

    /// Number of stored links across all chains.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }

    /// Links in ascending hash order; links sharing a hash come out in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.slots
            .values()
            .flat_map(|chain| chain.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}
