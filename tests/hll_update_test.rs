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

use googletest::assert_that;
use googletest::prelude::near;
use streamcount::hash::key_hash;
use streamcount::hll::HllSketch;

// Precision 16 has a relative standard error around 0.4%; this leaves
// plenty of headroom without letting real regressions through.
const RELATIVE_ERROR: f64 = 0.03;

fn estimate_for(distinct: u64) -> f64 {
    let mut sketch = HllSketch::new(16);
    for i in 0..distinct {
        sketch.update(key_hash(&i.to_le_bytes()));
    }
    sketch.estimate()
}

#[test]
fn test_empty_sketch() {
    let sketch = HllSketch::new(16);
    assert_eq!(sketch.estimate(), 0.0);
    assert_eq!(sketch.registers().len(), 1 << 16);
    assert!(sketch.registers().iter().all(|&register| register == 0));
}

#[test]
fn test_small_cardinality_is_nearly_exact() {
    let estimate = estimate_for(1000);
    assert_that!(estimate, near(1000.0, RELATIVE_ERROR * 1000.0));
}

#[test]
fn test_medium_cardinality() {
    let estimate = estimate_for(100_000);
    assert_that!(estimate, near(100_000.0, RELATIVE_ERROR * 100_000.0));
}

#[test]
fn test_large_cardinality() {
    let estimate = estimate_for(1_000_000);
    assert_that!(estimate, near(1_000_000.0, RELATIVE_ERROR * 1_000_000.0));
}

#[test]
fn test_duplicates_do_not_inflate_estimate() {
    let mut sketch = HllSketch::new(16);
    for _ in 0..10 {
        for i in 0..1000u64 {
            sketch.update(key_hash(&i.to_le_bytes()));
        }
    }
    assert_that!(sketch.estimate(), near(1000.0, RELATIVE_ERROR * 1000.0));
}

#[test]
fn test_register_round_trip_preserves_estimate() {
    let mut sketch = HllSketch::new(16);
    for i in 0..5000u64 {
        sketch.update(key_hash(&i.to_le_bytes()));
    }

    let copy = HllSketch::from_registers(16, sketch.registers().to_vec());
    assert_eq!(copy.estimate(), sketch.estimate());
    assert_eq!(copy, sketch);
}

#[test]
fn test_lower_precisions_still_estimate() {
    let mut sketch = HllSketch::new(8);
    for i in 0..10_000u64 {
        sketch.update(key_hash(&i.to_le_bytes()));
    }
    // 256 registers put the standard error around 6.5%.
    assert_that!(sketch.estimate(), near(10_000.0, 0.25 * 10_000.0));
}
