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
use googletest::prelude::contains_substring;
use streamcount::counter::BoundedCounter;
use streamcount::error::ErrorKind;

fn assert_equivalent(left: &BoundedCounter, right: &BoundedCounter) {
    assert_eq!(left.buckets(), right.buckets());
    assert_eq!(left.total(), right.total());
    assert_eq!(left.len(), right.len());
    assert_eq!(left.mem(), right.mem());
    assert_eq!(left.cardinality(), right.cardinality());
    assert_eq!(left.quality(), right.quality());
    assert_eq!(left.histogram(), right.histogram());

    let left_pairs: Vec<(Vec<u8>, i64)> = left
        .iter()
        .map(|(key, count)| (key.to_vec(), count))
        .collect();
    let right_pairs: Vec<(Vec<u8>, i64)> = right
        .iter()
        .map(|(key, count)| (key.to_vec(), count))
        .collect();
    assert_eq!(left_pairs, right_pairs);

    for (key, count) in &left_pairs {
        assert_eq!(right.get(key), *count);
    }
}

#[test]
fn test_round_trip_without_prune() {
    let mut counter = BoundedCounter::new(2048).unwrap();
    for i in 0..1000u32 {
        counter
            .increment_by(format!("word-{i}").as_bytes(), (i % 7) as i64 + 1)
            .unwrap();
    }

    let bytes = counter.serialize();
    let restored = BoundedCounter::deserialize(&bytes).unwrap();
    assert_equivalent(&counter, &restored);

    for i in 0..1000u32 {
        let key = format!("word-{i}");
        assert_eq!(restored.get(key.as_bytes()), counter.get(key.as_bytes()));
    }
}

#[test]
fn test_round_trip_after_pruning() {
    let mut counter = BoundedCounter::new(1024).unwrap();
    for i in 0..4096u32 {
        counter
            .increment_by(format!("item-{}", i % 2000).as_bytes(), (i % 3) as i64)
            .unwrap();
    }

    let bytes = counter.serialize();
    let restored = BoundedCounter::deserialize(&bytes).unwrap();
    assert_equivalent(&counter, &restored);
}

#[test]
fn test_round_trip_preserves_zombies() {
    let mut counter = BoundedCounter::new(64).unwrap();
    counter.set(b"alive", 4).unwrap();
    counter.set(b"dead", 4).unwrap();
    counter.remove(b"dead");

    let restored = BoundedCounter::deserialize(&counter.serialize()).unwrap();
    assert_equivalent(&counter, &restored);
    assert_eq!(restored.get(b"dead"), 0);
    // The zombie's key bytes travel with the snapshot and are reclaimed by
    // the next prune, exactly as in the source counter.
    assert_eq!(restored.mem(), counter.mem());
}

#[test]
fn test_restored_counter_remains_usable() {
    let mut counter = BoundedCounter::new(8).unwrap();
    counter.update(["a", "b", "c"]).unwrap();

    let mut restored = BoundedCounter::deserialize(&counter.serialize()).unwrap();
    for i in 0..20u32 {
        restored.increment(format!("extra{i}").as_bytes()).unwrap();
    }
    // Growth past 3/4 load pruned the restored table in place.
    assert!(restored.len() <= 6);
    assert!(restored.cardinality() > restored.len() as u64);
}

#[test]
fn test_empty_round_trip() {
    let counter = BoundedCounter::new(4).unwrap();
    let restored = BoundedCounter::deserialize(&counter.serialize()).unwrap();
    assert_equivalent(&counter, &restored);
    assert!(restored.is_empty());
}

#[test]
fn test_deserialize_rejects_foreign_bytes() {
    let err = BoundedCounter::deserialize(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptSnapshot);

    let mut bytes = BoundedCounter::new(8).unwrap().serialize();
    bytes[0] ^= 0xff;
    let err = BoundedCounter::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptSnapshot);
    assert_that!(err.message(), contains_substring("not a counter snapshot"));
}

#[test]
fn test_deserialize_rejects_unknown_version() {
    let mut bytes = BoundedCounter::new(8).unwrap().serialize();
    bytes[1] = 99;
    let err = BoundedCounter::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptSnapshot);
    assert_that!(err.message(), contains_substring("version"));
}

#[test]
fn test_deserialize_rejects_truncation() {
    let mut counter = BoundedCounter::new(64).unwrap();
    counter.update(["x", "y", "z"]).unwrap();
    let bytes = counter.serialize();

    for len in [1, 10, bytes.len() / 2, bytes.len() - 1] {
        let err = BoundedCounter::deserialize(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptSnapshot, "prefix of {len}");
    }
}

#[test]
fn test_deserialize_rejects_exhausted_keys_blob() {
    let mut counter = BoundedCounter::new(8).unwrap();
    counter.increment(b"somekey").unwrap();
    let mut bytes = counter.serialize();

    // Strip the key's terminator so the last word never ends.
    let histo_and_hll = 8 + 1024 + 8 + 65536;
    let terminator = bytes.len() - histo_and_hll - 1;
    assert_eq!(bytes[terminator], 0);
    bytes.remove(terminator);
    // Patch the keys blob length and byte accounting to match.
    let keys_len = 7u64;
    let str_allocated_offset = 2 + 4 + 8;
    bytes[str_allocated_offset..str_allocated_offset + 8]
        .copy_from_slice(&keys_len.to_le_bytes());
    let keys_len_offset = 2 + 4 + 28 + 8 + 8 * 9;
    bytes[keys_len_offset..keys_len_offset + 8].copy_from_slice(&keys_len.to_le_bytes());

    let err = BoundedCounter::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptSnapshot);
    assert_that!(err.message(), contains_substring("keys blob exhausted"));
}
