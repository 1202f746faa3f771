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

//! Key hashing for the counter table and its cardinality sketch.

/// Seed shared by every table so that identical keys always land in the same
/// bucket and produce the same sketch coupon, including across snapshots.
pub const KEY_HASH_SEED: u32 = 42;

/// Hashes a key with MurmurHash3 x86 32-bit and the fixed seed.
///
/// The full 32-bit value doubles as the HyperLogLog input; bucket selection
/// masks it afterwards.
#[inline]
pub fn key_hash(key: &[u8]) -> u32 {
    mur3::murmurhash3_x86_32(key, KEY_HASH_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        // Public murmur3_x86_32 vectors pin the upstream implementation.
        assert_eq!(mur3::murmurhash3_x86_32(b"", 0), 0);
        assert_eq!(mur3::murmurhash3_x86_32(b"", 1), 0x514E28B7);
        assert_eq!(mur3::murmurhash3_x86_32(b"", 0xFFFFFFFF), 0x81F16F39);
        assert_eq!(mur3::murmurhash3_x86_32(b"Hello, world!", 1234), 0xFAF6CDB3);
        assert_eq!(mur3::murmurhash3_x86_32(b"Hello, world!", 4321), 0xBF505788);
    }

    #[test]
    fn test_seed_is_fixed() {
        assert_eq!(key_hash(b"abc"), mur3::murmurhash3_x86_32(b"abc", 42));
        assert_ne!(key_hash(b"abc"), key_hash(b"abd"));
    }
}
