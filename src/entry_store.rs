//! EntryStore: slot array with stable indices, a name index, and typed access.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::value::{try_copy_str, Value, ValueType};
use core::fmt;
use core::hash::BuildHasher;
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;
use tracing::{debug, error, trace, warn};

/// Stable handle to a slot. Valid from the add (or query) that produced it
/// until the entry in that slot is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Index(usize);

impl Index {
    pub const fn new(slot: usize) -> Self {
        Index(slot)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub fn key<'a, S>(&self, store: &'a EntryStore<S>) -> Result<&'a str>
    where
        S: BuildHasher,
    {
        store.key(*self)
    }

    pub fn value_type<S>(&self, store: &EntryStore<S>) -> Result<ValueType>
    where
        S: BuildHasher,
    {
        store.get_type(*self)
    }
}

impl From<usize> for Index {
    fn from(slot: usize) -> Self {
        Index(slot)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    key: String,
    value: Value,
    hash: u64,
}

/// Slot-array store of named entries, each holding one scalar of a type
/// chosen when the entry is added.
///
/// Slots never move: removal leaves a hole that the next add may reuse
/// (lowest empty slot first), and growth only appends. Lookup by name goes
/// through a hash index of slot positions keyed by each entry's stored hash.
#[derive(Clone)]
pub struct EntryStore<S = RandomState> {
    hasher: S,
    index: HashTable<usize>,
    slots: Vec<Option<Entry>>, // position == Index
    len: usize,
    config: StoreConfig,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_config_and_hasher(config, Default::default())
    }

    /// Like `with_config`, but reports a failed slot allocation instead of
    /// aborting.
    pub fn try_with_config(config: StoreConfig) -> Result<Self> {
        Self::try_with_config_and_hasher(config, Default::default())
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored hash of the entry at `slot`, for rehashing the name index.
fn slot_hash(slots: &[Option<Entry>], slot: usize) -> u64 {
    slots
        .get(slot)
        .and_then(|s| s.as_ref())
        .map(|e| e.hash)
        .unwrap_or(0)
}

fn empty_slots(n: usize) -> Result<Vec<Option<Entry>>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(n)
        .map_err(|_| StoreError::OutOfMemory)?;
    slots.resize_with(n, || None);
    Ok(slots)
}

fn invalid_type(expected: ValueType, found: &Value) -> StoreError {
    StoreError::InvalidType {
        expected,
        found: found.value_type(),
    }
}

impl<S> EntryStore<S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(StoreConfig::default(), hasher)
    }

    pub fn with_config_and_hasher(config: StoreConfig, hasher: S) -> Self {
        let mut slots = Vec::with_capacity(config.initial_capacity);
        slots.resize_with(config.initial_capacity, || None);
        Self {
            hasher,
            index: HashTable::new(),
            slots,
            len: 0,
            config,
        }
    }

    pub fn try_with_config_and_hasher(config: StoreConfig, hasher: S) -> Result<Self> {
        let slots = empty_slots(config.initial_capacity)?;
        Ok(Self {
            hasher,
            index: HashTable::new(),
            slots,
            len: 0,
            config,
        })
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of slots, occupied or not. Equal to `end()`.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Releases the store and every key and string it owns.
    pub fn destroy(self) {
        trace!(capacity = self.slots.len(), len = self.len, "store destroyed");
    }

    fn find_slot(&self, hash: u64, key: &str) -> Option<usize> {
        self.index
            .find(hash, |&i| {
                self.slots
                    .get(i)
                    .and_then(|s| s.as_ref())
                    .map(|e| e.key == key)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let hash = self.hasher.hash_one(key);
        self.find_slot(hash, key).is_some()
    }

    /// Index of the entry named `key` (exact byte comparison).
    pub fn query(&self, key: &str) -> Result<Index> {
        let hash = self.hasher.hash_one(key);
        self.find_slot(hash, key)
            .map(Index)
            .ok_or(StoreError::KeyNotPresent)
    }

    /// Converts a signed handle into an `Index`, rejecting values outside
    /// `[0, capacity)`.
    pub fn checked_index(&self, raw: i64) -> Result<Index> {
        match usize::try_from(raw) {
            Ok(i) if i < self.slots.len() => Ok(Index(i)),
            _ => Err(StoreError::OutOfBounds {
                index: raw,
                capacity: self.slots.len(),
            }),
        }
    }

    fn bounds(&self, index: Index) -> Result<usize> {
        if index.0 < self.slots.len() {
            Ok(index.0)
        } else {
            Err(StoreError::OutOfBounds {
                index: i64::try_from(index.0).unwrap_or(i64::MAX),
                capacity: self.slots.len(),
            })
        }
    }

    fn entry(&self, index: Index) -> Result<&Entry> {
        let i = self.bounds(index)?;
        self.slots[i].as_ref().ok_or(StoreError::KeyNotPresent)
    }

    fn entry_mut(&mut self, index: Index) -> Result<&mut Entry> {
        let i = self.bounds(index)?;
        self.slots[i].as_mut().ok_or(StoreError::KeyNotPresent)
    }

    /// Appends `growth_increment` empty slots. Existing slots keep their
    /// positions; nothing changes if the allocation fails.
    fn grow(&mut self) -> Result<()> {
        let old = self.slots.len();
        let add = self.config.growth_increment.get();
        if self.slots.try_reserve_exact(add).is_err() {
            warn!(capacity = old, add, "slot array growth failed");
            return Err(StoreError::OutOfMemory);
        }
        self.slots.resize_with(old + add, || None);
        debug!(from = old, to = self.slots.len(), "slot array grown");
        Ok(())
    }

    /// Adds an entry named `key` holding values of `value_type` and returns
    /// its index. Numbers start at zero, strings start unset.
    ///
    /// Fails with `KeyExists` if the name is taken. On any failure the store
    /// is left as it was, apart from possibly having grown.
    pub fn add(&mut self, key: &str, value_type: ValueType) -> Result<Index> {
        let hash = self.hasher.hash_one(key);
        if self.find_slot(hash, key).is_some() {
            return Err(StoreError::KeyExists(key.to_owned()));
        }

        // Allocate everything fallible before occupying a slot.
        let owned = try_copy_str(key)?;
        self.index
            .try_reserve(1, |&i| slot_hash(&self.slots, i))
            .map_err(|_| StoreError::OutOfMemory)?;
        if self.len == self.slots.len() {
            self.grow()?;
        }

        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            error!(
                capacity = self.slots.len(),
                len = self.len,
                "no empty slot after growth"
            );
            return Err(StoreError::Fatal);
        };
        self.slots[slot] = Some(Entry {
            key: owned,
            value: value_type.initial_value(),
            hash,
        });
        self.index
            .insert_unique(hash, slot, |&i| slot_hash(&self.slots, i));
        self.len += 1;
        trace!(key, index = slot, %value_type, "entry added");
        Ok(Index(slot))
    }

    /// Removes the entry at `index`, returning its key and last value. The
    /// slot becomes empty; every other index stays valid.
    pub fn remove(&mut self, index: Index) -> Result<(String, Value)> {
        let i = self.bounds(index)?;
        let entry = self.slots[i].take().ok_or(StoreError::KeyNotPresent)?;

        // Unlink from the name index.
        match self.index.find_entry(entry.hash, |&k| k == i) {
            Ok(e) => {
                e.remove();
            }
            Err(_) => debug_assert!(false, "occupied slot {} missing from name index", i),
        }
        self.len -= 1;
        trace!(key = entry.key.as_str(), index = i, "entry removed");
        Ok((entry.key, entry.value))
    }

    /// Empties every slot; capacity is kept.
    pub fn clear(&mut self) {
        for s in self.slots.iter_mut() {
            *s = None;
        }
        self.index.clear();
        self.len = 0;
    }

    /// Borrow the key of the entry at `index`.
    pub fn key(&self, index: Index) -> Result<&str> {
        self.entry(index).map(|e| e.key.as_str())
    }

    /// Owned copy of the key of the entry at `index`.
    pub fn get_key(&self, index: Index) -> Result<String> {
        try_copy_str(self.key(index)?)
    }

    pub fn get_type(&self, index: Index) -> Result<ValueType> {
        self.entry(index).map(|e| e.value.value_type())
    }

    /// Borrow the value at `index`, whatever its type.
    pub fn value(&self, index: Index) -> Result<&Value> {
        self.entry(index).map(|e| &e.value)
    }

    /// Owned copy of the value at `index`, whatever its type.
    pub fn get_value(&self, index: Index) -> Result<Value> {
        self.value(index)?.try_clone()
    }

    // Not public: handing out `&mut Value` would let callers change the
    // variant and with it the entry's type.
    fn value_mut(&mut self, index: Index) -> Result<&mut Value> {
        self.entry_mut(index).map(|e| &mut e.value)
    }

    /// Replaces the value at `index`. `value` must have the entry's type.
    pub fn set_value(&mut self, index: Index, value: Value) -> Result<()> {
        let slot = self.value_mut(index)?;
        if slot.value_type() != value.value_type() {
            return Err(invalid_type(value.value_type(), slot));
        }
        *slot = value;
        Ok(())
    }

    pub fn get_i32(&self, index: Index) -> Result<i32> {
        match self.value(index)? {
            Value::Int32(v) => Ok(*v),
            other => Err(invalid_type(ValueType::Int32, other)),
        }
    }

    pub fn get_i64(&self, index: Index) -> Result<i64> {
        match self.value(index)? {
            Value::Int64(v) => Ok(*v),
            other => Err(invalid_type(ValueType::Int64, other)),
        }
    }

    pub fn get_f32(&self, index: Index) -> Result<f32> {
        match self.value(index)? {
            Value::Float(v) => Ok(*v),
            other => Err(invalid_type(ValueType::Float, other)),
        }
    }

    pub fn get_f64(&self, index: Index) -> Result<f64> {
        match self.value(index)? {
            Value::Double(v) => Ok(*v),
            other => Err(invalid_type(ValueType::Double, other)),
        }
    }

    /// Owned copy of a string value; `None` if it was never set.
    pub fn get_string(&self, index: Index) -> Result<Option<String>> {
        match self.value(index)? {
            Value::String(s) => s.as_deref().map(try_copy_str).transpose(),
            other => Err(invalid_type(ValueType::String, other)),
        }
    }

    pub fn set_i32(&mut self, index: Index, v: i32) -> Result<()> {
        match self.value_mut(index)? {
            Value::Int32(slot) => {
                *slot = v;
                Ok(())
            }
            other => Err(invalid_type(ValueType::Int32, other)),
        }
    }

    pub fn set_i64(&mut self, index: Index, v: i64) -> Result<()> {
        match self.value_mut(index)? {
            Value::Int64(slot) => {
                *slot = v;
                Ok(())
            }
            other => Err(invalid_type(ValueType::Int64, other)),
        }
    }

    pub fn set_f32(&mut self, index: Index, v: f32) -> Result<()> {
        match self.value_mut(index)? {
            Value::Float(slot) => {
                *slot = v;
                Ok(())
            }
            other => Err(invalid_type(ValueType::Float, other)),
        }
    }

    pub fn set_f64(&mut self, index: Index, v: f64) -> Result<()> {
        match self.value_mut(index)? {
            Value::Double(slot) => {
                *slot = v;
                Ok(())
            }
            other => Err(invalid_type(ValueType::Double, other)),
        }
    }

    /// Stores a copy of `v`, dropping the previous string. If the copy
    /// cannot be allocated the previous string is kept.
    pub fn set_string(&mut self, index: Index, v: &str) -> Result<()> {
        match self.value_mut(index)? {
            Value::String(slot) => {
                *slot = Some(try_copy_str(v)?);
                Ok(())
            }
            other => Err(invalid_type(ValueType::String, other)),
        }
    }

    /// First occupied index, or `end()` when the store is empty.
    pub fn begin(&self) -> Index {
        self.scan_from(0)
    }

    /// One past the last slot (the capacity). Never occupied.
    pub fn end(&self) -> Index {
        Index(self.slots.len())
    }

    /// Next occupied index after `it`, or `end()`.
    ///
    /// The protocol takes no snapshot: adding or removing entries between
    /// calls changes what later calls report.
    pub fn next(&self, it: Index) -> Index {
        self.scan_from(it.0.saturating_add(1))
    }

    fn scan_from(&self, start: usize) -> Index {
        self.slots
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, s)| s.is_some())
            .map(|(i, _)| Index(i))
            .unwrap_or_else(|| self.end())
    }

    /// Occupied indices in ascending order, driven by `begin`/`next`.
    pub fn indices(&self) -> Indices<'_, S> {
        Indices {
            store: self,
            cursor: self.begin(),
        }
    }

    /// Live entries in ascending slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            it: self.slots.iter().enumerate(),
        }
    }
}

impl<S> EntryStore<S>
where
    S: BuildHasher + Clone,
{
    /// Independent deep copy with the same capacity and the same entries
    /// at the same indices.
    ///
    /// On allocation failure the partial copy is dropped before returning
    /// `OutOfMemory`; `self` is never modified.
    pub fn try_duplicate(&self) -> Result<Self> {
        self.copy_parts()
            .map(|(slots, index)| {
                debug!(capacity = slots.len(), len = self.len, "store duplicated");
                Self {
                    hasher: self.hasher.clone(),
                    index,
                    slots,
                    len: self.len,
                    config: self.config,
                }
            })
            .map_err(|e| {
                warn!(error = %e, "duplicate failed; partial copy discarded");
                e
            })
    }

    fn copy_parts(&self) -> Result<(Vec<Option<Entry>>, HashTable<usize>)> {
        let mut slots = empty_slots(self.slots.len())?;
        for (dst, src) in slots.iter_mut().zip(&self.slots) {
            if let Some(e) = src {
                *dst = Some(Entry {
                    key: try_copy_str(&e.key)?,
                    value: e.value.try_clone()?,
                    hash: e.hash,
                });
            }
        }

        let mut index = HashTable::new();
        index
            .try_reserve(self.len, |&i| slot_hash(&slots, i))
            .map_err(|_| StoreError::OutOfMemory)?;
        for (i, s) in slots.iter().enumerate() {
            if let Some(e) = s {
                index.insert_unique(e.hash, i, |&j| slot_hash(&slots, j));
            }
        }
        Ok((slots, index))
    }
}

impl<S> fmt::Debug for EntryStore<S>
where
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a, S>(&'a EntryStore<S>);
        impl<S: BuildHasher> fmt::Debug for Entries<'_, S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.iter().map(|(i, k, v)| ((i.get(), k), v)))
                    .finish()
            }
        }
        f.debug_struct("EntryStore")
            .field("capacity", &self.slots.len())
            .field("len", &self.len)
            .field("entries", &Entries(self))
            .finish()
    }
}

/// Iterator over live entries as `(Index, key, value)`.
pub struct Iter<'a> {
    it: core::iter::Enumerate<core::slice::Iter<'a, Option<Entry>>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Index, &'a str, &'a Value);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().find_map(|(i, s)| {
            s.as_ref()
                .map(|e| (Index(i), e.key.as_str(), &e.value))
        })
    }
}

impl<'a, S> IntoIterator for &'a EntryStore<S>
where
    S: BuildHasher,
{
    type Item = (Index, &'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over occupied indices.
pub struct Indices<'a, S> {
    store: &'a EntryStore<S>,
    cursor: Index,
}

impl<'a, S> Iterator for Indices<'a, S>
where
    S: BuildHasher,
{
    type Item = Index;
    fn next(&mut self) -> Option<Index> {
        if self.cursor >= self.store.end() {
            return None;
        }
        let cur = self.cursor;
        self.cursor = self.store.next(cur);
        Some(cur)
    }
}
