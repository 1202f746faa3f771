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

//! Snapshot wire format for the counter.
//!
//! Little-endian throughout: a two-byte family/version preamble, the
//! bucket count, the fixed header (`total:i64, str_allocated:u64,
//! size:u32, max_prune:i64`), then four length-prefixed blobs in the order
//! cells, keys, histogram, HLL registers. Cells are a flag byte plus the
//! count; keys are the NUL-terminated key bytes of every occupied slot in
//! slot order.

use byteorder::{ByteOrder, LE};

use crate::codec::{SketchBytes, SketchSlice};
use crate::counter::histogram::{CountHistogram, BINS};
use crate::counter::sketch::BoundedCounter;
use crate::counter::table::{Cell, CellTable, CARDINALITY_PRECISION};
use crate::error::{Error, ErrorKind};
use crate::hll::HllSketch;

/// Family ID for the bounded counter.
const FAMILY_ID: u8 = 21;
/// Serialization version.
const SERIAL_VERSION: u8 = 1;

/// Bytes per cell on the wire: occupancy flag plus count.
const CELL_WIRE_BYTES: usize = 9;
/// Bytes of the histogram blob.
const HISTO_WIRE_BYTES: usize = BINS * 4;
/// Bytes of the HLL register blob.
const HLL_WIRE_BYTES: usize = 1 << CARDINALITY_PRECISION;

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::CorruptSnapshot, message)
}

impl BoundedCounter {
    /// Serializes the full counter state into a byte vector.
    pub fn serialize(&self) -> Vec<u8> {
        let table = &self.table;
        let cells_len = table.cells.len() * CELL_WIRE_BYTES;
        let keys_len = table.str_allocated as usize;

        let mut out = SketchBytes::with_capacity(
            2 + 4 + 28 + 4 * 8 + cells_len + keys_len + HISTO_WIRE_BYTES + HLL_WIRE_BYTES,
        );
        out.write_u8(FAMILY_ID);
        out.write_u8(SERIAL_VERSION);
        out.write_u32_le(table.buckets());
        out.write_i64_le(table.total);
        out.write_u64_le(table.str_allocated);
        out.write_u32_le(table.size);
        out.write_i64_le(table.max_prune);

        out.write_u64_le(cells_len as u64);
        for cell in &table.cells {
            out.write_u8(cell.key.is_some() as u8);
            out.write_i64_le(cell.count);
        }

        out.write_u64_le(keys_len as u64);
        for cell in &table.cells {
            if let Some(key) = cell.key.as_deref() {
                out.write(key);
                out.write_u8(0);
            }
        }

        out.write_u64_le(HISTO_WIRE_BYTES as u64);
        let mut histo_bytes = [0u8; HISTO_WIRE_BYTES];
        LE::write_u32_into(table.histogram.bins(), &mut histo_bytes);
        out.write(&histo_bytes);

        let registers = table.hll.registers();
        out.write_u64_le(registers.len() as u64);
        out.write(registers);

        out.into_bytes()
    }

    /// Restores a counter from [`serialize`](Self::serialize) output.
    ///
    /// Returns `CorruptSnapshot` when the preamble does not match, any
    /// blob length disagrees with the recorded bucket count, or the keys
    /// blob runs out before every occupied slot has a key. Bytes past the
    /// last blob are ignored.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut slice = SketchSlice::new(bytes);
        let eof =
            |src: std::io::Error| corrupt("snapshot ends inside the header").set_source(src);

        let family = slice.read_u8().map_err(eof)?;
        if family != FAMILY_ID {
            return Err(corrupt("not a counter snapshot")
                .with_context("expected", FAMILY_ID)
                .with_context("got", family));
        }
        let version = slice.read_u8().map_err(eof)?;
        if version != SERIAL_VERSION {
            return Err(corrupt("unsupported serialization version")
                .with_context("version", version));
        }

        let buckets = slice.read_u32_le().map_err(eof)?;
        if !buckets.is_power_of_two() || buckets < 4 {
            return Err(corrupt("invalid bucket count").with_context("buckets", buckets));
        }
        let total = slice.read_i64_le().map_err(eof)?;
        let str_allocated = slice.read_u64_le().map_err(eof)?;
        let size = slice.read_u32_le().map_err(eof)?;
        let max_prune = slice.read_i64_le().map_err(eof)?;

        let cells_blob = read_blob(&mut slice, bytes.len(), "cells")?;
        if cells_blob.len() != buckets as usize * CELL_WIRE_BYTES {
            return Err(corrupt("cell blob length does not match the bucket count")
                .with_context("len", cells_blob.len())
                .with_context("buckets", buckets));
        }
        let keys_blob = read_blob(&mut slice, bytes.len(), "keys")?;
        if keys_blob.len() as u64 != str_allocated {
            return Err(corrupt("keys blob length does not match the key accounting")
                .with_context("len", keys_blob.len())
                .with_context("str_allocated", str_allocated));
        }
        let histo_blob = read_blob(&mut slice, bytes.len(), "histogram")?;
        if histo_blob.len() != HISTO_WIRE_BYTES {
            return Err(corrupt("histogram blob has the wrong length")
                .with_context("len", histo_blob.len()));
        }
        let hll_blob = read_blob(&mut slice, bytes.len(), "hll")?;
        if hll_blob.len() != HLL_WIRE_BYTES {
            return Err(corrupt("hll register blob has the wrong length")
                .with_context("len", hll_blob.len()));
        }

        // Cells first: counts and occupancy flags, keys installed after.
        let mut cells = Vec::with_capacity(buckets as usize);
        let mut occupied = 0u32;
        for chunk in cells_blob.chunks_exact(CELL_WIRE_BYTES) {
            let flag = chunk[0];
            if flag > 1 {
                return Err(corrupt("invalid cell occupancy flag").with_context("flag", flag));
            }
            occupied += flag as u32;
            cells.push(Cell {
                key: None,
                count: LE::read_i64(&chunk[1..]),
            });
        }
        if occupied != size {
            return Err(corrupt("occupied cell flags disagree with the recorded size")
                .with_context("flags", occupied)
                .with_context("size", size));
        }

        // Re-own one NUL-terminated word per occupied slot, in slot order.
        let mut cursor = 0usize;
        for (slot, chunk) in cells_blob.chunks_exact(CELL_WIRE_BYTES).enumerate() {
            if chunk[0] == 0 {
                continue;
            }
            let rest = &keys_blob[cursor..];
            let Some(nul) = rest.iter().position(|&b| b == 0) else {
                return Err(corrupt("keys blob exhausted before all occupied slots were filled")
                    .with_context("slot", slot));
            };
            cells[slot].key = Some(rest[..nul].to_vec().into_boxed_slice());
            cursor += nul + 1;
        }

        let mut bins = [0u32; BINS];
        LE::read_u32_into(&histo_blob, &mut bins);

        Ok(Self {
            table: CellTable {
                cells,
                mask: buckets - 1,
                size,
                str_allocated,
                total,
                max_prune,
                histogram: CountHistogram::from_bins(bins),
                hll: HllSketch::from_registers(CARDINALITY_PRECISION, hll_blob),
            },
        })
    }
}

/// Reads one length-prefixed blob, guarding the prefix against lengths
/// that could not possibly fit in the input.
fn read_blob(
    slice: &mut SketchSlice<'_>,
    input_len: usize,
    name: &'static str,
) -> Result<Vec<u8>, Error> {
    let len = slice
        .read_u64_le()
        .map_err(|src| corrupt("snapshot ends inside a blob length").with_context("blob", name).set_source(src))?;
    if len > input_len as u64 {
        return Err(corrupt("blob length exceeds the snapshot size")
            .with_context("blob", name)
            .with_context("len", len));
    }
    let mut blob = vec![0u8; len as usize];
    slice
        .read_exact(&mut blob)
        .map_err(|src| corrupt("snapshot ends inside a blob").with_context("blob", name).set_source(src))?;
    Ok(blob)
}
