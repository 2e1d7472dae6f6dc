// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::bounds::Bounds;
use crate::object_id::ObjectId;
use crate::storage_order;
use crate::value::Value;

/// A named reference held by a tree: either a child subtree or a leaf
/// feature, immutable once constructed.
///
/// Which of the two it is comes from the list it lives in (a tree's `trees`
/// or `features`); the entry itself is shape-identical in both cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    id: ObjectId,
    metadata_id: Option<ObjectId>,
    bounds: Option<Bounds>,
    extra_data: BTreeMap<String, Value>,
}

impl Node {
    /// Creates an entry with just a name and id.
    #[must_use]
    pub fn new(name: impl Into<String>, id: ObjectId) -> Self {
        Node {
            name: name.into(),
            id,
            metadata_id: None,
            bounds: None,
            extra_data: BTreeMap::new(),
        }
    }

    /// Creates a fully-specified entry.
    #[must_use]
    pub fn with_details(
        name: impl Into<String>,
        id: ObjectId,
        metadata_id: Option<ObjectId>,
        bounds: Option<Bounds>,
        extra_data: BTreeMap<String, Value>,
    ) -> Self {
        Node {
            name: name.into(),
            id,
            metadata_id,
            bounds,
            extra_data,
        }
    }

    /// The entry name, unique within its tree.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id of the referenced object.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The id of the metadata object (e.g. the feature type) if any.
    #[must_use]
    pub fn metadata_id(&self) -> Option<ObjectId> {
        self.metadata_id
    }

    /// The spatial bounds of the referenced object if known.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Extra attributes, keyed by name. Consumed by external index
    /// materialization; the codec only round-trips them.
    #[must_use]
    pub fn extra_data(&self) -> &BTreeMap<String, Value> {
        &self.extra_data
    }

    /// The storage order of this entry relative to `other`.
    ///
    /// This is the persisted order of entries within a tree; it depends only
    /// on the names, never on ids or insertion order.
    #[must_use]
    pub fn storage_cmp(&self, other: &Node) -> Ordering {
        storage_order::compare(&self.name, &other.name)
    }
}
