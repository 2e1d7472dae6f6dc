// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The in-memory tree model.
//!
//! A [`Tree`] is immutable and content-addressed: its id is the hash of its
//! own canonical encoding, computed at construction. Two trees holding the
//! same entries have the same id no matter how they were assembled.

use std::collections::BTreeMap;

use crate::bounds::Bounds;
use crate::codec;
use crate::node::Node;
use crate::object_id::ObjectId;

mod builder;
mod stored;

pub use builder::TreeBuilder;
pub use stored::StoredTree;

/// A pointer from an inner tree to one child subtree, keyed by bucket
/// index in the parent's table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Id of the child tree.
    pub id: ObjectId,
    /// Union of the bounds of everything under the child, if any entry
    /// has bounds.
    pub bounds: Option<Bounds>,
}

/// An immutable, content-addressed tree of named entries.
///
/// A tree is either a leaf (direct `trees` and `features` entries) or an
/// inner node (a sparse `buckets` table); never both. The recursive totals
/// `size` and `num_trees` are carried explicitly so they survive without
/// walking children.
#[derive(Debug, Clone)]
pub struct Tree {
    id: ObjectId,
    size: u64,
    num_trees: u32,
    trees: Vec<Node>,
    features: Vec<Node>,
    buckets: BTreeMap<u8, Bucket>,
}

impl Tree {
    /// Builds a tree from its parts and computes its id from the canonical
    /// encoding. Entry lists are sorted into storage order first, so callers
    /// may pass them in any order.
    ///
    /// # Panics
    ///
    /// Panics if both direct entries and buckets are given; a tree is a
    /// leaf or an inner node, never both.
    #[must_use]
    pub fn new(
        size: u64,
        num_trees: u32,
        mut trees: Vec<Node>,
        mut features: Vec<Node>,
        buckets: BTreeMap<u8, Bucket>,
    ) -> Tree {
        assert!(
            buckets.is_empty() || (trees.is_empty() && features.is_empty()),
            "a tree holds direct entries or buckets, not both"
        );
        trees.sort_by(Node::storage_cmp);
        features.sort_by(Node::storage_cmp);
        let mut tree = Tree {
            id: ObjectId::NULL,
            size,
            num_trees,
            trees,
            features,
            buckets,
        };
        tree.id = ObjectId::from_content(&codec::encode_tree(&tree));
        tree
    }

    /// Builds a tree around an id already known to be correct, e.g. one
    /// verified during decode. Entry lists must already be in storage order.
    #[must_use]
    pub(crate) fn with_id(
        id: ObjectId,
        size: u64,
        num_trees: u32,
        trees: Vec<Node>,
        features: Vec<Node>,
        buckets: BTreeMap<u8, Bucket>,
    ) -> Tree {
        Tree {
            id,
            size,
            num_trees,
            trees,
            features,
            buckets,
        }
    }

    /// The canonical empty tree.
    #[must_use]
    pub fn empty() -> Tree {
        Tree::new(0, 0, Vec::new(), Vec::new(), BTreeMap::new())
    }

    /// A leaf tree holding only feature entries.
    #[must_use]
    pub fn leaf(features: Vec<Node>) -> Tree {
        let size = features.len() as u64;
        Tree::new(size, 0, Vec::new(), features, BTreeMap::new())
    }

    /// The id of this tree: the hash of its canonical encoding.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Total number of features under this tree, recursively.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Total number of child trees under this tree, recursively.
    #[must_use]
    pub fn num_trees(&self) -> u32 {
        self.num_trees
    }

    /// Direct child-tree entries, in storage order. Empty for inner nodes.
    #[must_use]
    pub fn trees(&self) -> &[Node] {
        &self.trees
    }

    /// Direct feature entries, in storage order. Empty for inner nodes.
    #[must_use]
    pub fn features(&self) -> &[Node] {
        &self.features
    }

    /// The sparse bucket table. Empty for leaves.
    #[must_use]
    pub fn buckets(&self) -> &BTreeMap<u8, Bucket> {
        &self.buckets
    }

    /// True if this tree holds direct entries (or nothing) rather than
    /// buckets.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.buckets.is_empty()
    }

    /// True for the canonical empty tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0 && self.num_trees == 0 && self.is_leaf() && self.trees.is_empty()
    }
}

impl PartialEq for Tree {
    /// Content addressing makes id equality content equality.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tree {}
