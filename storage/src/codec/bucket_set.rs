// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Codec for the bucket table of an inner tree.
//!
//! Buckets are sparse: only occupied indices are written, each as a fixed
//! index byte, a child tree id, and either a full `f64` bounding box or a
//! single NaN sentinel when the child carries no bounds. Records are
//! variable-length, so decoding walks them in order.

use std::collections::BTreeMap;

use crate::bounds::Bounds;
use crate::codec::reader::{Reader, WriteBytes};
use crate::error::DecodeError;
use crate::tree::Bucket;

/// The hard ceiling on bucket indices at any depth. The fan-out schedule
/// never exceeds it, and the persisted index byte must stay below it.
pub const MAX_BUCKETS: u8 = 128;

/// Appends the encoded bucket table.
///
/// # Panics
///
/// Panics if any bucket index is `MAX_BUCKETS` or more; the fan-out
/// schedule can never produce one, so this is a programmer error.
pub(crate) fn encode(buckets: &BTreeMap<u8, Bucket>, out: &mut Vec<u8>) {
    out.push_u32_be(buckets.len() as u32);
    for (&index, bucket) in buckets {
        assert!(
            index < MAX_BUCKETS,
            "bucket index {index} out of range (max {MAX_BUCKETS})"
        );
        out.push(index);
        out.push_object_id(&bucket.id);
        match bucket.bounds {
            Some(bounds) => {
                out.push_f64_be(bounds.min_x);
                out.push_f64_be(bounds.max_x);
                out.push_f64_be(bounds.min_y);
                out.push_f64_be(bounds.max_y);
            }
            None => out.push_f64_be(f64::NAN),
        }
    }
}

/// Decodes the full bucket table at `offset`.
///
/// Bounds precision here is `f64`: bucket boxes are unions of many child
/// boxes and accumulate error if narrowed.
pub(crate) fn decode(data: &[u8], offset: usize) -> Result<BTreeMap<u8, Bucket>, DecodeError> {
    let mut reader = Reader::at(data, offset);
    let count = reader.read_u32_be("bucket count")?;
    let mut buckets = BTreeMap::new();
    for _ in 0..count {
        let index = reader.read_u8("bucket index")?;
        let id = reader.read_object_id("bucket tree id")?;
        let min_x = reader.read_f64_be("bucket bounds")?;
        let bounds = if min_x.is_nan() {
            None
        } else {
            let max_x = reader.read_f64_be("bucket bounds")?;
            let min_y = reader.read_f64_be("bucket bounds")?;
            let max_y = reader.read_f64_be("bucket bounds")?;
            Some(Bounds::new(min_x, max_x, min_y, max_y))
        };
        if buckets.insert(index, Bucket { id, bounds }).is_some() {
            return Err(DecodeError::DuplicateBucketIndex { index });
        }
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_id::ObjectId;

    fn sample() -> BTreeMap<u8, Bucket> {
        BTreeMap::from([
            (
                0,
                Bucket {
                    id: ObjectId::from_content(b"bucket 0"),
                    bounds: Some(Bounds::new(-180.0, 180.0, -90.0, 90.0)),
                },
            ),
            (
                3,
                Bucket {
                    id: ObjectId::from_content(b"bucket 3"),
                    bounds: None,
                },
            ),
            (
                31,
                Bucket {
                    id: ObjectId::from_content(b"bucket 31"),
                    bounds: Some(Bounds::point(12.5, -60.25)),
                },
            ),
        ])
    }

    #[test]
    fn round_trip_preserves_sparse_indices_and_bounds() {
        let buckets = sample();
        let mut out = vec![0xAAu8; 5];
        encode(&buckets, &mut out);
        assert_eq!(decode(&out, 5).unwrap(), buckets);
    }

    #[test]
    fn unbounded_bucket_takes_one_sentinel_float() {
        let unbounded = BTreeMap::from([(
            7,
            Bucket {
                id: ObjectId::from_content(b"x"),
                bounds: None,
            },
        )]);
        let mut out = Vec::new();
        encode(&unbounded, &mut out);
        // count + index + id + one f64 sentinel
        assert_eq!(out.len(), 4 + 1 + ObjectId::NUM_BYTES + 8);
    }

    #[test]
    fn duplicate_index_rejected() {
        let bucket = Bucket {
            id: ObjectId::from_content(b"dup"),
            bounds: None,
        };
        let mut out = Vec::new();
        out.push_u32_be(2);
        for _ in 0..2 {
            out.push(9);
            out.push_object_id(&bucket.id);
            out.push_f64_be(f64::NAN);
        }
        assert_eq!(
            decode(&out, 0),
            Err(DecodeError::DuplicateBucketIndex { index: 9 })
        );
    }

    #[test]
    #[should_panic(expected = "bucket index 128 out of range")]
    fn encode_rejects_index_past_ceiling() {
        let buckets = BTreeMap::from([(
            MAX_BUCKETS,
            Bucket {
                id: ObjectId::from_content(b"too far"),
                bounds: None,
            },
        )]);
        encode(&buckets, &mut Vec::new());
    }
}
