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

//! Bounded-memory approximate frequency counting.
//!
//! The crate centers on [`counter::BoundedCounter`], a fixed-capacity
//! counter for unbounded streams of byte-string keys: exact counting while
//! the table has room, automatic eviction of the least-frequent keys when
//! it fills, and a [`hll::HllSketch`] running alongside so the distinct-key
//! estimate stays reliable after evictions.
//!
//! ```rust
//! use streamcount::counter::BoundedCounter;
//!
//! let mut counter = BoundedCounter::new(1 << 16)?;
//! for word in ["to", "be", "or", "not", "to", "be"] {
//!     counter.increment(word)?;
//! }
//! assert_eq!(counter.get("to"), 2);
//! assert_eq!(counter.total(), 6);
//! assert_eq!(counter.cardinality(), 4);
//! # Ok::<(), streamcount::error::Error>(())
//! ```

mod codec;

pub mod counter;
pub mod error;
pub mod hash;
pub mod hll;
