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

//! Bounded-memory frequency counting over byte-string keys.
//!
//! [`BoundedCounter`] keeps approximate per-key counts in a fixed-capacity
//! open-addressed table. Crossing 3/4 load triggers a self-prune that
//! drops the lowest-count entries, so memory never grows while heavy
//! hitters survive. A HyperLogLog sketch fed on every insertion preserves
//! the distinct-key estimate after pruning.
//!
//! # Usage
//!
//! ```rust
//! use streamcount::counter::BoundedCounter;
//!
//! let mut counter = BoundedCounter::new(64)?;
//! counter.increment(b"apple")?;
//! counter.increment_by(b"banana", 3)?;
//!
//! assert_eq!(counter.get(b"banana"), 3);
//! assert_eq!(counter.total(), 4);
//! assert_eq!(counter.cardinality(), 2);
//! # Ok::<(), streamcount::error::Error>(())
//! ```
//!
//! # Serialization
//!
//! ```rust
//! use streamcount::counter::BoundedCounter;
//!
//! let mut counter = BoundedCounter::new(64)?;
//! counter.increment_by(b"apple", 2)?;
//!
//! let bytes = counter.serialize();
//! let restored = BoundedCounter::deserialize(&bytes)?;
//! assert_eq!(restored.get(b"apple"), 2);
//! # Ok::<(), streamcount::error::Error>(())
//! ```

mod histogram;
mod serialization;
mod sketch;
mod table;

pub use self::sketch::BoundedCounter;
pub use self::sketch::Iter;
pub use self::sketch::Keys;
pub use self::sketch::MAX_BUCKETS;
pub use self::sketch::MIN_BUCKETS;
