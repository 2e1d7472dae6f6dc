// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Content-addressed object storage.
//!
//! Anything that can hold encoded objects under their ids can back the tree
//! builder; the in-memory implementation here is enough for tests and for
//! staging work that is flushed elsewhere.

use std::collections::HashMap;

use crate::codec::{decode_tree, encode_tree};
use crate::error::DecodeError;
use crate::object_id::ObjectId;
use crate::tree::{StoredTree, Tree};

/// A content-addressed key/value store for encoded objects.
///
/// Writes are idempotent: storing the same id twice is a no-op, since equal
/// ids imply equal content.
pub trait ObjectStore {
    /// True if `id` is present.
    fn contains(&self, id: &ObjectId) -> bool;

    /// The encoded object stored under `id`, if any.
    fn get(&self, id: &ObjectId) -> Option<Vec<u8>>;

    /// Stores `data` under `id`. Returns false if the id was already
    /// present (and leaves the stored bytes untouched).
    fn put(&mut self, id: ObjectId, data: Vec<u8>) -> bool;

    /// Fetches and wraps the tree stored under `id`. The id is passed
    /// through as trusted; it was the lookup key.
    ///
    /// # Errors
    ///
    /// Fails if the stored bytes do not decode as a tree.
    fn get_tree(&self, id: &ObjectId) -> Result<Option<StoredTree>, DecodeError> {
        self.get(id)
            .map(|data| decode_tree(data, Some(*id)))
            .transpose()
    }

    /// Encodes and stores `tree` under its id.
    fn put_tree(&mut self, tree: &Tree) -> bool {
        self.put(tree.id(), encode_tree(tree))
    }

    /// Looks up many ids, reporting each hit and miss to the callbacks.
    fn get_many<'a, I, F, M>(&self, ids: I, mut found: F, mut missing: M)
    where
        I: IntoIterator<Item = &'a ObjectId>,
        F: FnMut(&ObjectId, Vec<u8>),
        M: FnMut(&ObjectId),
    {
        for id in ids {
            match self.get(id) {
                Some(data) => found(id, data),
                None => missing(id),
            }
        }
    }

    /// Stores many objects; returns how many were newly inserted.
    fn put_many<I>(&mut self, objects: I) -> usize
    where
        I: IntoIterator<Item = (ObjectId, Vec<u8>)>,
    {
        let mut inserted = 0;
        for (id, data) in objects {
            if self.put(id, data) {
                inserted += 1;
            }
        }
        inserted
    }
}

/// A heap-backed store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: HashMap<ObjectId, Vec<u8>>,
}

impl MemoryObjectStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    fn get(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.objects.get(id).cloned()
    }

    fn put(&mut self, id: ObjectId, data: Vec<u8>) -> bool {
        use std::collections::hash_map::Entry;
        match self.objects.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(data);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn put_is_idempotent() {
        let mut store = MemoryObjectStore::new();
        let id = ObjectId::from_content(b"object");
        assert!(store.put(id, b"payload".to_vec()));
        assert!(!store.put(id, b"payload".to_vec()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id), Some(b"payload".to_vec()));
    }

    #[test]
    fn tree_round_trip_through_store() {
        let mut store = MemoryObjectStore::new();
        let tree = Tree::leaf(vec![Node::new("f", ObjectId::from_content(b"f"))]);
        assert!(store.put_tree(&tree));
        let stored = store.get_tree(&tree.id()).unwrap().unwrap();
        assert_eq!(stored.id(), tree.id());
        assert!(store.get_tree(&ObjectId::from_content(b"nope")).unwrap().is_none());
    }

    #[test]
    fn get_many_reports_hits_and_misses() {
        let mut store = MemoryObjectStore::new();
        let present = ObjectId::from_content(b"present");
        let absent = ObjectId::from_content(b"absent");
        store.put(present, vec![1, 2, 3]);
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        store.get_many(
            [&present, &absent],
            |id, data| hits.push((*id, data)),
            |id| misses.push(*id),
        );
        assert_eq!(hits, vec![(present, vec![1, 2, 3])]);
        assert_eq!(misses, vec![absent]);
    }
}
