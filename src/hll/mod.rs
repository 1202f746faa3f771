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

//! HyperLogLog sketch for cardinality estimation over 32-bit hashes.
//!
//! The sketch keeps `2^precision` one-byte registers. Each incoming hash
//! selects a register with its top `precision` bits; the remaining bits
//! contribute their leading-zero rank. Feeding the same hash twice is a
//! no-op, which is what lets the counter re-insert keys after a prune
//! without inflating the estimate.
//!
//! # Usage
//!
//! ```rust
//! use streamcount::hash::key_hash;
//! use streamcount::hll::HllSketch;
//!
//! let mut sketch = HllSketch::new(16);
//! for i in 0u32..1000 {
//!     sketch.update(key_hash(&i.to_le_bytes()));
//! }
//! let estimate = sketch.estimate();
//! assert!((estimate - 1000.0).abs() < 50.0);
//! ```

mod sketch;

pub use self::sketch::HllSketch;

/// Smallest accepted precision (16 registers).
pub const MIN_PRECISION: u8 = 4;

/// Largest accepted precision. Hashes are 32 bits wide, so the register
/// index may consume at most half of them.
pub const MAX_PRECISION: u8 = 16;
