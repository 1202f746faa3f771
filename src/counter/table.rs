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

//! Open-addressed cell table with the compacting prune walk.

use crate::counter::histogram::CountHistogram;
use crate::error::{Error, ErrorKind};
use crate::hash::key_hash;
use crate::hll::HllSketch;

/// Precision of the distinct-key sketch fed by the table.
pub(super) const CARDINALITY_PRECISION: u8 = 16;

/// A table slot. Empty slots carry no key and a zero count. An occupied
/// slot with a zero count is a zombie: it keeps its key so probe chains
/// stay intact, and is reclaimed by the next prune.
#[derive(Debug, Clone, Default)]
pub(super) struct Cell {
    pub(super) key: Option<Box<[u8]>>,
    pub(super) count: i64,
}

/// Linear-probing table of (key, count) cells plus the bookkeeping that
/// every mutation keeps in step: occupancy histogram, distinct-key sketch,
/// key-byte accounting, and the running count sum.
#[derive(Debug, Clone)]
pub(super) struct CellTable {
    pub(super) cells: Vec<Cell>,
    pub(super) mask: u32,
    /// Occupied cells, zombies included.
    pub(super) size: u32,
    /// Bytes attributed to key storage, one terminator byte per key.
    pub(super) str_allocated: u64,
    /// Sum of all cell counts.
    pub(super) total: i64,
    /// Highest prune boundary ever applied; zero means never pruned.
    pub(super) max_prune: i64,
    pub(super) histogram: CountHistogram,
    pub(super) hll: HllSketch,
}

impl CellTable {
    /// Allocates an empty table. `buckets` must already be a power of two;
    /// the public constructor validates and rounds the user's request.
    pub(super) fn new(buckets: u32) -> Result<Self, Error> {
        debug_assert!(buckets.is_power_of_two() && buckets >= 4);
        let mut cells = Vec::new();
        cells.try_reserve_exact(buckets as usize).map_err(|src| {
            Error::new(ErrorKind::OutOfMemory, "unable to allocate the cell table")
                .with_context("buckets", buckets)
                .set_source(src)
        })?;
        cells.resize_with(buckets as usize, Cell::default);
        Ok(Self {
            cells,
            mask: buckets - 1,
            size: 0,
            str_allocated: 0,
            total: 0,
            max_prune: 0,
            histogram: CountHistogram::new(),
            hll: HllSketch::new(CARDINALITY_PRECISION),
        })
    }

    pub(super) fn buckets(&self) -> u32 {
        self.cells.len() as u32
    }

    /// Occupied cells with a positive count.
    pub(super) fn live(&self) -> u32 {
        self.size - self.histogram.zombies()
    }

    /// Walks the probe chain for `key` starting at `bucket`. Stops on the
    /// first empty slot or key match and returns that slot's index.
    /// Terminates because the load factor stays strictly below 1.
    fn probe_from(&self, mut bucket: usize, key: &[u8]) -> usize {
        let mask = self.mask as usize;
        while let Some(existing) = self.cells[bucket].key.as_deref() {
            if existing == key {
                break;
            }
            bucket = (bucket + 1) & mask;
        }
        bucket
    }

    /// Finds the slot for `key` without touching the sketch. The returned
    /// slot is either the key's cell or the empty slot that ends its chain.
    pub(super) fn find_slot(&self, key: &[u8]) -> usize {
        let bucket = (key_hash(key) & self.mask) as usize;
        self.probe_from(bucket, key)
    }

    /// Finds or allocates the cell for `key`, feeding the sketch on the
    /// initial probe and pruning first when the table is at 3/4 load. The
    /// post-prune retry re-probes without re-feeding: survivors may have
    /// moved backward and opened an earlier slot in the chain.
    pub(super) fn slot_for_insert(&mut self, key: &[u8]) -> Result<usize, Error> {
        let hash = key_hash(key);
        self.hll.update(hash);
        let mut slot = self.probe_from((hash & self.mask) as usize, key);

        if self.cells[slot].key.is_none() {
            if self.size >= (self.buckets() >> 2) * 3 {
                let boundary = self.histogram.prune_boundary(self.size, self.buckets());
                self.prune_to(boundary);
                slot = self.find_slot(key);
            }

            let mut owned = Vec::new();
            owned.try_reserve_exact(key.len()).map_err(|src| {
                Error::new(ErrorKind::OutOfMemory, "unable to copy a key into the table")
                    .with_context("key_len", key.len())
                    .set_source(src)
            })?;
            owned.extend_from_slice(key);

            self.size += 1;
            self.str_allocated += key.len() as u64 + 1;
            self.cells[slot] = Cell {
                key: Some(owned.into_boxed_slice()),
                count: 0,
            };
            self.histogram.record(0);
        }
        Ok(slot)
    }

    /// Stores a new count in an occupied slot, keeping histogram and total
    /// in step.
    pub(super) fn store_count(&mut self, slot: usize, value: i64) {
        debug_assert!(self.cells[slot].key.is_some());
        let old = self.cells[slot].count;
        self.histogram.transfer(old, value);
        self.total += value - old;
        self.cells[slot].count = value;
    }

    /// Evicts every cell with a count at or below `boundary` and compacts
    /// the survivors in place.
    ///
    /// The walk starts just past an empty slot: from there, every probe
    /// chain it meets begins at or after the slots already processed, so a
    /// survivor can only ever move backward, toward `last_free`, and no gap
    /// is opened inside a chain that is still pending. A survivor moves
    /// when its distance past the most recent free slot exceeds its
    /// distance past its ideal bucket.
    pub(super) fn prune_to(&mut self, boundary: i64) {
        if boundary > self.max_prune {
            self.max_prune = boundary;
        }
        self.histogram.reset();

        let mask = self.mask as usize;
        debug_assert!(self.size < self.buckets(), "prune requires an empty slot");
        let mut start = 0usize;
        while self.cells[start].key.is_some() {
            start += 1;
        }

        let mut surviving = 0u32;
        let mut last_free = start;
        let mut i = start;
        loop {
            i = (i + 1) & mask;
            match self.cells[i].key.take() {
                None => {
                    last_free = i;
                }
                Some(key) => {
                    let count = self.cells[i].count;
                    if count > boundary {
                        let ideal = (key_hash(&key) & self.mask) as usize;
                        let mut target = ideal;
                        if (i.wrapping_sub(last_free) & mask) > (i.wrapping_sub(ideal) & mask) {
                            target = i;
                        }
                        while target != i && self.cells[target].key.is_some() {
                            target = (target + 1) & mask;
                        }
                        if target != i {
                            self.cells[target] = Cell {
                                key: Some(key),
                                count,
                            };
                            self.cells[i].count = 0;
                            last_free = i;
                        } else {
                            self.cells[i].key = Some(key);
                        }
                        self.histogram.record(count);
                        surviving += 1;
                    } else {
                        self.str_allocated -= key.len() as u64 + 1;
                        self.total -= count;
                        self.cells[i].count = 0;
                        last_free = i;
                    }
                }
            }
            if i == start {
                break;
            }
        }

        self.size = surviving;
    }
}
