// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Storage order of tree entries, derived from a non-cryptographic FNV-1a
//! hash of the entry name.
//!
//! This module mandates the order in which entries are stored inside trees
//! and the bucket any entry falls into at a given sharding depth, regardless
//! of insertion order or how many subtrees a tree is split into. Because a
//! name always lands in the same bucket at the same depth, two trees holding
//! the same entries hash to the same [`ObjectId`](crate::ObjectId), and a
//! diff between two versions can skip entire equal bucket subtrees.
//!
//! The hash is the 64-bit FNV-1a variant computed over the UTF-16 code units
//! of the name, each code unit contributing its two bytes in big-endian
//! order. This must never change: it defines the canonical encoding and
//! therefore every tree id ever persisted.

use std::cmp::Ordering;

const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// The deepest sharding level; one hash byte is consumed per level,
/// most-significant byte first.
pub const MAX_DEPTH: u8 = 8;

/// Computes the 64-bit FNV-1a hash of `name` over its UTF-16 code units.
#[must_use]
pub fn fnv1a_64(name: &str) -> u64 {
    let mut hash = FNV64_OFFSET_BASIS;
    for unit in name.encode_utf16() {
        let [hi, lo] = unit.to_be_bytes();
        hash = update(hash, hi);
        hash = update(hash, lo);
    }
    hash
}

#[inline]
fn update(hash: u64, octet: u8) -> u64 {
    (hash ^ u64::from(octet)).wrapping_mul(FNV64_PRIME)
}

/// In how many bucket subtrees a full leaf tree is split at `depth`.
///
/// These fan-outs are fixed. Together with [`normalized_size_limit`] they
/// balance tree growth against nesting depth, and they feed the canonical
/// form of every sharded tree, so changing them would change persisted ids.
///
/// # Panics
///
/// Panics if `depth >= 8`.
#[must_use]
pub fn max_buckets_for_level(depth: u8) -> u8 {
    assert!(depth < MAX_DEPTH, "depth too deep: {depth}");
    match depth {
        0..=2 => 32,
        3 | 4 => 8,
        5 | 6 => 4,
        _ => 2,
    }
}

/// The maximum number of entries a leaf tree may hold at `depth` before it
/// must be split into [`max_buckets_for_level`] buckets.
///
/// # Panics
///
/// Panics if `depth >= 8`.
#[must_use]
pub fn normalized_size_limit(depth: u8) -> usize {
    assert!(depth < MAX_DEPTH, "depth too deep: {depth}");
    match depth {
        0..=2 => 512,
        _ => 256,
    }
}

/// The bucket index for an entry named `name` at the given sharding depth.
///
/// # Panics
///
/// Panics if `depth >= 8`.
#[must_use]
pub fn bucket(name: &str, depth: u8) -> u8 {
    bucket_of_hash(fnv1a_64(name), depth)
}

/// Same as [`bucket`], for a name hash already computed with [`fnv1a_64`].
///
/// Extracts the unsigned byte at position `7 - depth` of the hash and
/// rescales it from `0..=255` into `0..max_buckets_for_level(depth)`.
///
/// # Panics
///
/// Panics if `depth >= 8`.
#[must_use]
pub fn bucket_of_hash(hash: u64, depth: u8) -> u8 {
    let byte = hash_byte(hash, depth);
    let max_buckets = u32::from(max_buckets_for_level(depth));
    ((u32::from(byte) * max_buckets) / 256) as u8
}

/// # Panics
///
/// Panics if `depth >= 8`.
fn hash_byte(hash: u64, depth: u8) -> u8 {
    assert!(depth < MAX_DEPTH, "depth too deep: {depth}");
    let shift = 8 * (7 - u32::from(depth));
    (hash >> shift) as u8
}

/// The total storage order over entry names.
///
/// Names are ordered by their bucket indices depth-by-depth, falling back to
/// plain string comparison for distinct names whose hashes collide all the
/// way down. This is exactly the persisted order of entries within a tree.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_hashed(fnv1a_64(a), a, fnv1a_64(b), b)
}

/// [`compare`] for names whose hashes are already known.
#[must_use]
pub fn compare_hashed(hash_a: u64, a: &str, hash_b: u64, b: &str) -> Ordering {
    for depth in 0..MAX_DEPTH {
        match bucket_of_hash(hash_a, depth).cmp(&bucket_of_hash(hash_b, depth)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    // Same bucket all the way down; canonical string order breaks the tie.
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fnv1a_64_bytes(bytes: &[u8]) -> u64 {
        bytes.iter().fold(FNV64_OFFSET_BASIS, |h, b| update(h, *b))
    }

    #[test]
    fn hashes_utf16_code_units_big_endian() {
        // "ab" is the UTF-16 byte stream 00 61 00 62.
        assert_eq!(fnv1a_64("ab"), fnv1a_64_bytes(&[0x00, 0x61, 0x00, 0x62]));
        // A non-BMP char is two code units (a surrogate pair), four octets.
        let crab = "\u{1F980}";
        let units: Vec<u16> = crab.encode_utf16().collect();
        assert_eq!(units.len(), 2);
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_be_bytes()).collect();
        assert_eq!(fnv1a_64(crab), fnv1a_64_bytes(&bytes));
    }

    #[test]
    fn empty_name_hashes_to_offset_basis() {
        assert_eq!(fnv1a_64(""), FNV64_OFFSET_BASIS);
    }

    #[test]
    fn octet_hash_matches_published_fnv1a_vectors() {
        assert_eq!(fnv1a_64_bytes(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64_bytes(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test_case(0, 32, 512)]
    #[test_case(1, 32, 512)]
    #[test_case(2, 32, 512)]
    #[test_case(3, 8, 256)]
    #[test_case(4, 8, 256)]
    #[test_case(5, 4, 256)]
    #[test_case(6, 4, 256)]
    #[test_case(7, 2, 256)]
    fn level_parameters(depth: u8, buckets: u8, limit: usize) {
        assert_eq!(max_buckets_for_level(depth), buckets);
        assert_eq!(normalized_size_limit(depth), limit);
    }

    #[test]
    fn buckets_stay_in_range_at_every_depth() {
        for name in ["", "a", "roads/1", "parcels.1234", "\u{1F980}\u{00e9}"] {
            for depth in 0..MAX_DEPTH {
                let b = bucket(name, depth);
                assert!(b < max_buckets_for_level(depth), "{name} depth {depth}");
                // Deterministic across calls.
                assert_eq!(b, bucket(name, depth));
            }
        }
    }

    #[test]
    #[should_panic(expected = "depth too deep")]
    fn bucket_depth_is_bounded() {
        let _ = bucket("any", 8);
    }

    #[test]
    fn compare_is_a_strict_total_order() {
        let mut names: Vec<String> = (0..500).map(|i| format!("feature-{i}")).collect();
        names.sort_by(|a, b| compare(a, b));
        for pair in names.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less);
            assert_eq!(compare(&pair[1], &pair[0]), Ordering::Greater);
        }
        for name in &names {
            assert_eq!(compare(name, name), Ordering::Equal);
        }
    }

    #[test]
    fn order_is_consistent_with_bucketing() {
        // If a sorts before b purely by depth-0 bucket, the buckets must
        // reflect that; equal-bucket prefixes must agree depth by depth.
        let (a, b) = ("road-17", "building-4");
        let (ba, bb) = (bucket(a, 0), bucket(b, 0));
        if ba != bb {
            assert_eq!(compare(a, b), ba.cmp(&bb));
        }
    }
}
