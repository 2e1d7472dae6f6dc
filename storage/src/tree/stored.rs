// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! A tree backed by its encoded buffer, decoded on demand.

use std::collections::BTreeMap;

use crate::codec::buffer::DataBuffer;
use crate::codec::NodeSet;
use crate::error::DecodeError;
use crate::object_id::ObjectId;
use crate::tree::{Bucket, Tree};

/// A tree whose entries still live in the encoded buffer.
///
/// Construction parses only the framing, so the size and tree-count queries
/// are cheap no matter how large the tree is. Entry access goes through
/// lazy [`NodeSet`] views; [`to_tree`](StoredTree::to_tree) materializes
/// everything at once when owned data is wanted.
#[derive(Debug)]
pub struct StoredTree {
    buffer: DataBuffer,
    id: ObjectId,
}

impl StoredTree {
    pub(crate) fn new(buffer: DataBuffer, id: Option<ObjectId>) -> Result<StoredTree, DecodeError> {
        let id = match id {
            Some(id) => id,
            None => Self::rehash(&buffer)?,
        };
        Ok(StoredTree { buffer, id })
    }

    /// Recomputes the id from the buffer's canonical form. Materializes the
    /// entries once; only taken when the caller did not know the id.
    fn rehash(buffer: &DataBuffer) -> Result<ObjectId, DecodeError> {
        let trees = buffer.trees()?.build()?;
        let features = buffer.features()?.build()?;
        let buckets = buffer.buckets()?;
        let header = buffer.header();
        Ok(Tree::new(header.total_size, header.num_trees, trees, features, buckets).id())
    }

    /// The id of this tree.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Total number of features under this tree, recursively. Read from
    /// the header; never decodes an entry.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.buffer.header().total_size
    }

    /// Total number of child trees under this tree, recursively.
    #[must_use]
    pub fn num_trees(&self) -> u32 {
        self.buffer.header().num_trees
    }

    /// True if this tree holds direct entries (or nothing) rather than
    /// buckets. Answered from the tail alone.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !self.buffer.has_buckets()
    }

    /// Lazy view of the child-tree entries.
    ///
    /// # Errors
    ///
    /// Fails if the section header or the string table is malformed.
    pub fn trees(&self) -> Result<NodeSet<'_>, DecodeError> {
        self.buffer.trees()
    }

    /// Lazy view of the feature entries.
    ///
    /// # Errors
    ///
    /// Fails if the section header or the string table is malformed.
    pub fn features(&self) -> Result<NodeSet<'_>, DecodeError> {
        self.buffer.features()
    }

    /// The decoded bucket table; empty for leaves.
    ///
    /// # Errors
    ///
    /// Fails on a malformed or duplicate-index bucket section.
    pub fn buckets(&self) -> Result<BTreeMap<u8, Bucket>, DecodeError> {
        self.buffer.buckets()
    }

    /// Materializes the fully-owned [`Tree`], keeping this tree's id.
    ///
    /// # Errors
    ///
    /// Fails on any malformed entry section.
    pub fn to_tree(&self) -> Result<Tree, DecodeError> {
        let header = self.buffer.header();
        Ok(Tree::with_id(
            self.id,
            header.total_size,
            header.num_trees,
            self.buffer.trees()?.build()?,
            self.buffer.features()?.build()?,
            self.buffer.buckets()?,
        ))
    }
}

impl PartialEq for StoredTree {
    /// Content addressing makes id equality content equality.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StoredTree {}

impl PartialEq<Tree> for StoredTree {
    fn eq(&self, other: &Tree) -> bool {
        self.id == other.id()
    }
}
