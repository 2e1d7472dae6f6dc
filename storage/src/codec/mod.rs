// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The canonical tree encoding.
//!
//! An encoded tree is a single self-contained buffer:
//!
//! ```text
//! header | [tree entries] | [feature entries] | [buckets] | string table | tail
//! ```
//!
//! Section order is fixed and empty sections are omitted entirely; the tail
//! records each section's offset (zero when absent) and is found through a
//! fixed-width back-pointer in the last four bytes. The same entries always
//! produce the same bytes, which is what lets the buffer's hash serve as the
//! tree's identity.

use metrics::counter;

use crate::codec::framing::{Header, Tail};
use crate::codec::string_table::StringTableBuilder;
use crate::error::DecodeError;
use crate::logger::trace;
use crate::object_id::ObjectId;
use crate::tree::{StoredTree, Tree};

pub(crate) mod bucket_set;
pub(crate) mod buffer;
pub(crate) mod coords;
pub(crate) mod extra_data;
pub(crate) mod framing;
pub(crate) mod node_set;
pub(crate) mod reader;
pub(crate) mod string_table;

pub use bucket_set::MAX_BUCKETS;
pub use node_set::{NodeIter, NodeSet, NodeView};

/// Encodes `tree` into its canonical buffer.
///
/// Deterministic: equal trees produce byte-identical buffers, so the result
/// is safe to hash for identity.
///
/// # Panics
///
/// Panics if the tree carries both direct entries and buckets, or a bucket
/// index at or above [`MAX_BUCKETS`]. [`Tree`] construction rejects the
/// former and the fan-out schedule never produces the latter, so either is
/// a programmer error.
#[must_use]
pub fn encode_tree(tree: &Tree) -> Vec<u8> {
    assert!(
        tree.buckets().is_empty() || (tree.trees().is_empty() && tree.features().is_empty()),
        "a tree holds direct entries or buckets, not both"
    );

    let mut out = Vec::new();
    Header {
        total_size: tree.size(),
        num_trees: tree.num_trees(),
    }
    .encode_to(&mut out);

    let mut strings = StringTableBuilder::new();
    let mut tail = Tail::default();
    if !tree.trees().is_empty() {
        tail.off_trees = out.len();
        node_set::encode(tree.trees(), &mut out, &mut strings);
    }
    if !tree.features().is_empty() {
        tail.off_features = out.len();
        node_set::encode(tree.features(), &mut out, &mut strings);
    }
    if !tree.buckets().is_empty() {
        tail.off_buckets = out.len();
        bucket_set::encode(tree.buckets(), &mut out);
    }
    tail.off_stringtable = out.len();
    strings.encode_to(&mut out);
    tail.encode_to(&mut out);

    counter!("canopy.tree.encoded").increment(1);
    trace!(
        "encoded tree: {} bytes, {} features, {} buckets",
        out.len(),
        tree.size(),
        tree.buckets().len()
    );
    out
}

/// Wraps an encoded buffer as a [`StoredTree`] without decoding its entry
/// sections.
///
/// Pass the tree's id when it is already known (e.g. the storage key the
/// buffer was fetched under); with `None` the id is recomputed from the
/// buffer's canonical form, which requires materializing it once.
///
/// # Errors
///
/// Fails on malformed framing, a non-tree object tag, or a buffer carrying
/// both direct entries and buckets.
pub fn decode_tree(data: Vec<u8>, id: Option<ObjectId>) -> Result<StoredTree, DecodeError> {
    let buffer = buffer::DataBuffer::parse(data)?;
    counter!("canopy.tree.decoded").increment(1);
    StoredTree::new(buffer, id)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::node::Node;
    use crate::tree::Bucket;

    #[test]
    fn encoding_is_deterministic() {
        let tree = Tree::leaf(vec![
            Node::new("b", ObjectId::from_content(b"b")),
            Node::new("a", ObjectId::from_content(b"a")),
        ]);
        assert_eq!(encode_tree(&tree), encode_tree(&tree));
    }

    #[test]
    fn empty_tree_round_trips_with_no_sections() {
        let tree = Tree::empty();
        let encoded = encode_tree(&tree);
        let stored = decode_tree(encoded, None).unwrap();
        assert_eq!(stored.id(), tree.id());
        assert_eq!(stored.size(), 0);
        assert!(stored.is_leaf());
        assert!(stored.features().unwrap().is_empty());
        assert!(stored.trees().unwrap().is_empty());
        assert!(stored.buckets().unwrap().is_empty());
    }

    // A buffer claiming both direct entries and buckets can only come from
    // a buggy or hostile writer; it must be rejected before any section is
    // interpreted.
    #[test]
    fn mixed_buffer_is_rejected() {
        let mut out = Vec::new();
        Header {
            total_size: 1,
            num_trees: 0,
        }
        .encode_to(&mut out);
        let mut strings = StringTableBuilder::new();
        let mut tail = Tail::default();
        tail.off_features = out.len();
        node_set::encode(
            &[Node::new("a", ObjectId::from_content(b"a"))],
            &mut out,
            &mut strings,
        );
        tail.off_buckets = out.len();
        bucket_set::encode(
            &BTreeMap::from([(
                0,
                Bucket {
                    id: ObjectId::from_content(b"child"),
                    bounds: None,
                },
            )]),
            &mut out,
        );
        tail.off_stringtable = out.len();
        strings.encode_to(&mut out);
        tail.encode_to(&mut out);

        assert_eq!(decode_tree(out, None).unwrap_err(), DecodeError::MixedTree);
    }
}
