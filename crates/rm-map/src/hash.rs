//! Integer hash index over a table's row numbers.
//!
//! # Structure
//!
//! A key is reduced to one of [`HASH_MODULO`] buckets.  Each bucket heads a
//! singly linked chain threaded through `next[]`, which has one slot per row
//! of the indexed table: `next[i]` is the row added to the same bucket just
//! before row `i`.  Chains are therefore LIFO, and a chain holds every row of
//! the bucket, not only rows of one key, so callers compare the key of each
//! row they visit.
//!
//! An optional `values[]` array attaches a payload to each row.  Both arrays
//! only ever grow, and growing keeps every existing chain intact.
//!
//! Tables are owned by a [`HashRegistry`] rather than a process global; the
//! registry is what diagnostics and teardown walk.

use std::cell::Cell;

use rm_core::HashId;

use crate::{MapError, MapResult};

/// Number of buckets.
pub const HASH_MODULO: u32 = 256;

/// End of a chain.
const NONE: u32 = u32::MAX;
/// `next[]` value of a row that was never added.
const UNUSED: u32 = u32::MAX - 1;

/// Usage counters of one table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashSummary {
    pub name:      String,
    /// Buckets that received at least one row.
    pub lists:     u32,
    /// Rows added.
    pub items:     u32,
    /// `get_first` calls.
    pub searches:  u32,
    /// `get_first` + `get_next` calls.
    pub gets:      u32,
}

impl HashSummary {
    pub fn items_per_list(&self) -> Option<u32> {
        (self.lists > 0).then(|| self.items / self.lists)
    }

    pub fn loops_per_search(&self) -> Option<u32> {
        (self.searches > 0).then(|| self.gets / self.searches)
    }
}

// ── HashIndex ─────────────────────────────────────────────────────────────────

pub struct HashIndex<V = ()> {
    name:   String,
    head:   [u32; HASH_MODULO as usize],
    next:   Vec<u32>,
    values: Option<Vec<Option<V>>>,

    count_add_first: u32,
    count_add_next:  u32,
    count_get_first: Cell<u32>,
    count_get_next:  Cell<u32>,
}

impl<V> HashIndex<V> {
    /// An empty index able to hold rows `0..size`.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name:            name.into(),
            head:            [NONE; HASH_MODULO as usize],
            next:            vec![UNUSED; size],
            values:          None,
            count_add_first: 0,
            count_add_next:  0,
            count_get_first: Cell::new(0),
            count_get_next:  Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows the index can hold.
    pub fn size(&self) -> usize {
        self.next.len()
    }

    #[inline]
    fn bucket(key: u32) -> usize {
        (key % HASH_MODULO) as usize
    }

    fn check(&self, index: u32) -> MapResult<usize> {
        if index < UNUSED && (index as usize) < self.next.len() {
            Ok(index as usize)
        } else {
            log::error!("invalid index {index} in hash table {}", self.name);
            Err(MapError::out_of_range("hash", index, self.next.len()))
        }
    }

    /// Push row `index` onto the chain of `key`.  Each row joins at most
    /// one chain, once.
    pub fn add(&mut self, key: u32, index: u32) -> MapResult<()> {
        let slot = self.check(index)?;
        if self.next[slot] != UNUSED {
            log::error!("row {index} added twice to hash table {}", self.name);
            return Err(MapError::DuplicateHashRow { table: self.name.clone(), index });
        }
        let bucket = Self::bucket(key);

        if self.head[bucket] == NONE {
            self.count_add_first += 1;
        } else {
            self.count_add_next += 1;
        }

        self.next[slot] = self.head[bucket];
        self.head[bucket] = index;
        Ok(())
    }

    /// Most recently added row of the bucket of `key`.
    pub fn get_first(&self, key: u32) -> Option<u32> {
        self.count_get_first.set(self.count_get_first.get() + 1);
        let head = self.head[Self::bucket(key)];
        (head != NONE).then_some(head)
    }

    /// Row added to the same bucket just before `index`.
    pub fn get_next(&self, index: u32) -> MapResult<Option<u32>> {
        let slot = self.check(index)?;
        self.count_get_next.set(self.count_get_next.get() + 1);
        let next = self.next[slot];
        Ok((next < UNUSED).then_some(next))
    }

    /// Walk the whole chain of `key`, newest row first.
    pub fn chain(&self, key: u32) -> HashChain<'_, V> {
        HashChain { hash: self, cursor: self.get_first(key) }
    }

    /// Grow to hold rows `0..size`.  Shrinking is ignored.
    pub fn resize(&mut self, size: usize) {
        if size <= self.next.len() {
            return;
        }
        self.next.resize(size, UNUSED);
        if let Some(values) = self.values.as_mut() {
            values.resize_with(size, || None);
        }
    }

    /// Attach `value` to row `index`.
    pub fn set_value(&mut self, index: u32, value: V) -> MapResult<()> {
        let slot = self.check(index)?;
        let size = self.next.len();
        let values = self.values.get_or_insert_with(|| {
            let mut v = Vec::with_capacity(size);
            v.resize_with(size, || None);
            v
        });
        values[slot] = Some(value);
        Ok(())
    }

    /// Payload of row `index`, if one was set.
    pub fn get_value(&self, index: u32) -> MapResult<Option<&V>> {
        let slot = self.check(index)?;
        Ok(self.values.as_ref().and_then(|v| v[slot].as_ref()))
    }

    pub fn summary(&self) -> HashSummary {
        HashSummary {
            name:     self.name.clone(),
            lists:    self.count_add_first,
            items:    self.count_add_first + self.count_add_next,
            searches: self.count_get_first.get(),
            gets:     self.count_get_first.get() + self.count_get_next.get(),
        }
    }
}

/// Iterator over one bucket chain.
pub struct HashChain<'a, V> {
    hash:   &'a HashIndex<V>,
    cursor: Option<u32>,
}

impl<V> Iterator for HashChain<'_, V> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.cursor?;
        // Chain rows are always in range: `add` checked them.
        self.cursor = self.hash.get_next(current).ok().flatten();
        Some(current)
    }
}

/// Hash code of a string: sum of each byte weighted by its 1-based position.
pub fn hash_string(s: &str) -> u32 {
    s.bytes()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc.wrapping_add((b as u32).wrapping_mul(i as u32 + 1)))
}

// ── HashRegistry ──────────────────────────────────────────────────────────────

/// Owner of every live hash table of one map context.
pub struct HashRegistry<V = ()> {
    tables: Vec<Option<HashIndex<V>>>,
}

impl<V> Default for HashRegistry<V> {
    fn default() -> Self {
        Self { tables: Vec::new() }
    }
}

impl<V> HashRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table and return its handle.
    pub fn create(&mut self, name: impl Into<String>, size: usize) -> HashId {
        let id = HashId(self.tables.len() as u32);
        self.tables.push(Some(HashIndex::new(name, size)));
        id
    }

    pub fn get(&self, id: HashId) -> MapResult<&HashIndex<V>> {
        self.tables
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(MapError::UnknownHash(id))
    }

    pub fn get_mut(&mut self, id: HashId) -> MapResult<&mut HashIndex<V>> {
        self.tables
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(MapError::UnknownHash(id))
    }

    /// Remove one table.  Its handle is never reused.
    pub fn delete(&mut self, id: HashId) -> Option<HashIndex<V>> {
        self.tables.get_mut(id.index()).and_then(Option::take)
    }

    /// Drop every table.
    pub fn reset(&mut self) {
        self.tables.clear();
    }

    /// Number of live tables.
    pub fn len(&self) -> usize {
        self.tables.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usage counters of every live table, newest first; also logged.
    pub fn summary(&self) -> Vec<HashSummary> {
        let summaries: Vec<HashSummary> = self
            .tables
            .iter()
            .rev()
            .flatten()
            .map(HashIndex::summary)
            .collect();
        for s in &summaries {
            log::info!(
                "hash table {}: {} lists, {} items ({:?} items/list), {} get first, {} get ({:?} loops/search)",
                s.name,
                s.lists,
                s.items,
                s.items_per_list(),
                s.searches,
                s.gets,
                s.loops_per_search(),
            );
        }
        summaries
    }
}
