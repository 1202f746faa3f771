// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::mem::size_of;
use std::slice;

use crate::counter::histogram::{self, BINS};
use crate::counter::table::{Cell, CellTable};
use crate::error::{Error, ErrorKind};

/// Smallest accepted bucket request.
pub const MIN_BUCKETS: u64 = 4;

/// Largest accepted bucket request; capacities stay addressable by a
/// 32-bit mask.
pub const MAX_BUCKETS: u64 = u32::MAX as u64;

/// Approximate frequency counter over byte-string keys with a fixed memory
/// budget.
///
/// Counts live in an open-addressed table whose capacity never changes.
/// When the table passes 3/4 load it prunes itself: the lowest-count
/// entries are dropped until roughly half the capacity is free, so
/// long-lived heavy hitters survive while one-off keys are forgotten. A
/// HyperLogLog sketch fed at insertion keeps the distinct-key estimate
/// honest after pruning has destroyed the exact key set.
#[derive(Debug, Clone)]
pub struct BoundedCounter {
    pub(super) table: CellTable,
}

impl BoundedCounter {
    /// Creates a counter with `buckets` rounded *down* to a power of two.
    ///
    /// Requests below [`MIN_BUCKETS`] or above [`MAX_BUCKETS`] are
    /// rejected with `InvalidArgument`; allocation failure surfaces as
    /// `OutOfMemory`.
    pub fn new(buckets: u64) -> Result<Self, Error> {
        if buckets < MIN_BUCKETS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "the number of buckets must be at least 4",
            )
            .with_context("buckets", buckets));
        }
        if buckets > MAX_BUCKETS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "the number of buckets is too large",
            )
            .with_context("buckets", buckets));
        }
        let capacity = 1u32 << (63 - buckets.leading_zeros());
        Ok(Self {
            table: CellTable::new(capacity)?,
        })
    }

    /// Adds one to the count of `key`.
    pub fn increment(&mut self, key: impl AsRef<[u8]>) -> Result<(), Error> {
        self.increment_by(key, 1)
    }

    /// Adds `delta` to the count of `key`, allocating its cell on first
    /// sight.
    ///
    /// A negative delta is rejected; a zero delta succeeds without side
    /// effect. If the addition would overflow, the stored count is left
    /// unchanged.
    pub fn increment_by(&mut self, key: impl AsRef<[u8]>, delta: i64) -> Result<(), Error> {
        let key = key.as_ref();
        check_key(key)?;
        if delta < 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "increments must be non-negative",
            )
            .with_context("delta", delta));
        }
        if delta == 0 {
            return Ok(());
        }

        let slot = self.table.slot_for_insert(key)?;
        let count = self.table.cells[slot].count;
        if count > i64::MAX - delta {
            return Err(Error::new(ErrorKind::Overflow, "counter overflow")
                .with_context("count", count)
                .with_context("delta", delta));
        }
        self.table.store_count(slot, count + delta);
        Ok(())
    }

    /// Returns the count of `key`, 0 when absent.
    ///
    /// Once a prune has occurred the count is a lower bound: a pruned key
    /// restarts from zero when it reappears.
    pub fn get(&self, key: impl AsRef<[u8]>) -> i64 {
        let cell = &self.table.cells[self.table.find_slot(key.as_ref())];
        if cell.key.is_some() { cell.count } else { 0 }
    }

    /// Sets the count of `key` to `value`.
    ///
    /// Setting 0 on an absent key allocates nothing; setting 0 on a
    /// present key leaves a zombie cell behind, like [`remove`](Self::remove).
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: i64) -> Result<(), Error> {
        let key = key.as_ref();
        check_key(key)?;
        if value < 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "the counter only supports non-negative values",
            )
            .with_context("value", value));
        }

        if value == 0 {
            let slot = self.table.find_slot(key);
            if self.table.cells[slot].key.is_some() {
                self.table.store_count(slot, 0);
            }
            return Ok(());
        }

        let slot = self.table.slot_for_insert(key)?;
        self.table.store_count(slot, value);
        Ok(())
    }

    /// Clears the count of `key`.
    ///
    /// The cell is not freed: it keeps its key as a zombie so the probe
    /// chains through it stay intact, and is reclaimed by the next prune.
    /// Cardinality estimates are not defined once removals are used.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) {
        let slot = self.table.find_slot(key.as_ref());
        if self.table.cells[slot].key.is_some() {
            self.table.store_count(slot, 0);
        }
    }

    /// Sum of all stored counts.
    pub fn total(&self) -> i64 {
        self.table.total
    }

    /// Table capacity in buckets.
    pub fn buckets(&self) -> u32 {
        self.table.buckets()
    }

    /// Number of keys with a positive count.
    pub fn len(&self) -> usize {
        self.table.live() as usize
    }

    /// Returns true when no key has a positive count.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Heap bytes owned by the counter: cell array, key storage, and the
    /// histogram.
    pub fn mem(&self) -> u64 {
        (self.table.cells.len() * size_of::<Cell>()) as u64
            + self.table.str_allocated
            + (BINS * size_of::<u32>()) as u64
    }

    /// Estimated number of distinct keys ever inserted.
    ///
    /// Exact (equal to [`len`](Self::len)) until the first prune; afterwards
    /// served by the HyperLogLog sketch. Not meaningful when counts have
    /// been removed or set to zero.
    pub fn cardinality(&self) -> u64 {
        if self.table.max_prune == 0 {
            self.len() as u64
        } else {
            self.table.hll.estimate() as u64
        }
    }

    /// Ratio of the distinct-key estimate to the prune trigger point.
    /// Values approaching 1 predict an imminent prune; values above 1 mean
    /// the counter has been pruning and counts are lower bounds.
    pub fn quality(&self) -> f64 {
        let limit = ((self.buckets() >> 2) * 3) as f64;
        let measure = if self.table.max_prune == 0 {
            self.len() as f64
        } else {
            self.table.hll.estimate()
        };
        measure / limit
    }

    /// Evicts every key whose count is at or below `boundary`.
    ///
    /// Automatic pruning picks its own boundary from the count histogram;
    /// this entry point is for callers that want to shed weight early.
    pub fn prune(&mut self, boundary: i64) {
        self.table.prune_to(boundary);
    }

    /// Debug dump of the count histogram as `(lowest, highest, cells)`
    /// rows, one per bin.
    pub fn histogram(&self) -> Vec<(i64, i64, u32)> {
        let bins = self.table.histogram.bins();
        (0..BINS)
            .map(|i| {
                let low = histogram::bin_floor(i);
                let high = if i + 1 < BINS {
                    histogram::bin_floor(i + 1) - 1
                } else {
                    i64::MAX
                };
                (low, high, bins[i])
            })
            .collect()
    }

    /// Iterates over `(key, count)` pairs with positive counts, in table
    /// order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cells: self.table.cells.iter(),
        }
    }

    /// Iterates over keys with positive counts, in table order.
    pub fn keys(&self) -> Keys<'_> {
        Keys { inner: self.iter() }
    }

    /// Increments every key yielded by `keys` by one.
    pub fn update<I>(&mut self, keys: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for key in keys {
            self.increment_by(key, 1)?;
        }
        Ok(())
    }

    /// Applies `(key, delta)` pairs through [`increment_by`](Self::increment_by).
    pub fn update_pairs<I, K>(&mut self, pairs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<[u8]>,
    {
        for (key, delta) in pairs {
            self.increment_by(key, delta)?;
        }
        Ok(())
    }

    /// Adds all live pairs from another counter.
    pub fn merge(&mut self, other: &Self) -> Result<(), Error> {
        for (key, count) in other.iter() {
            self.increment_by(key, count)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a BoundedCounter {
    type Item = (&'a [u8], i64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over live `(key, count)` pairs.
pub struct Iter<'a> {
    cells: slice::Iter<'a, Cell>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], i64);

    fn next(&mut self) -> Option<Self::Item> {
        for cell in self.cells.by_ref() {
            if cell.count > 0 {
                if let Some(key) = cell.key.as_deref() {
                    return Some((key, cell.count));
                }
            }
        }
        None
    }
}

/// Iterator over live keys.
pub struct Keys<'a> {
    inner: Iter<'a>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }
}

/// Keys travel through the snapshot format as NUL-terminated words, so a
/// NUL inside a key is rejected where one could enter the table.
fn check_key(key: &[u8]) -> Result<(), Error> {
    if key.contains(&0) {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            "keys must not contain NUL bytes",
        ));
    }
    Ok(())
}
