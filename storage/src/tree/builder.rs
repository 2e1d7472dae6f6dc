// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Builds canonical trees from unsorted entries, sharding oversized levels
//! into bucket subtrees.
//!
//! The builder accumulates entries keyed by name (a later `put` under the
//! same name replaces the earlier one) and materializes the whole tree in
//! one pass: any level holding more entries than its size limit is split by
//! bucket index, children are persisted into the backing store, and the
//! parent keeps only bucket pointers. Because bucketing depends only on
//! entry names, the same entries always produce the same tree id no matter
//! the insertion order or how the tree was previously sharded.

use std::collections::{BTreeMap, HashMap};

use crate::bounds::Bounds;
use crate::logger::debug;
use crate::node::Node;
use crate::storage_order::{self, MAX_DEPTH};
use crate::store::ObjectStore;
use crate::tree::{Bucket, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Tree,
    Feature,
}

#[derive(Debug, Clone)]
struct Entry {
    kind: NodeKind,
    node: Node,
    /// Features under this entry, recursively; 1 for a feature.
    size: u64,
    /// Trees under this entry, recursively; 0 for a feature or a leaf tree.
    num_trees: u32,
}

/// Accumulates entries and materializes a canonical [`Tree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    entries: HashMap<String, Entry>,
}

impl TreeBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature entry, replacing any entry with the same name.
    pub fn put(&mut self, node: Node) {
        self.insert(NodeKind::Feature, node, 1, 0);
    }

    /// Adds a child-tree entry with its recursive totals, replacing any
    /// entry with the same name.
    pub fn put_tree(&mut self, node: Node, size: u64, num_trees: u32) {
        self.insert(NodeKind::Tree, node, size, num_trees);
    }

    /// Removes the entry named `name`; returns false if absent.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Number of entries currently staged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, kind: NodeKind, node: Node, size: u64, num_trees: u32) {
        self.entries.insert(
            node.name().to_string(),
            Entry {
                kind,
                node,
                size,
                num_trees,
            },
        );
    }

    /// Materializes the tree, persisting every bucket subtree and the root
    /// itself into `store`. The builder is left empty and may be reused.
    pub fn build<S: ObjectStore>(&mut self, store: &mut S) -> Tree {
        let entries: Vec<Entry> = std::mem::take(&mut self.entries).into_values().collect();
        let tree = build_level(entries, 0, store);
        store.put_tree(&tree);
        debug!(
            "built tree {}: {} features, {} subtrees",
            tree.id(),
            tree.size(),
            tree.num_trees()
        );
        tree
    }
}

fn build_level<S: ObjectStore>(entries: Vec<Entry>, depth: u8, store: &mut S) -> Tree {
    // Past the deepest level there is nothing left to shard by; the level
    // becomes an oversized leaf.
    if depth >= MAX_DEPTH || entries.len() <= storage_order::normalized_size_limit(depth) {
        return build_leaf(entries);
    }

    let mut partitions: BTreeMap<u8, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        let index = storage_order::bucket(entry.node.name(), depth);
        partitions.entry(index).or_default().push(entry);
    }

    let mut size = 0u64;
    let mut num_trees = 0u32;
    let mut buckets = BTreeMap::new();
    for (index, partition) in partitions {
        let bounds = partition
            .iter()
            .fold(None, |acc, e| Bounds::union(acc, e.node.bounds()));
        let child = build_level(partition, depth + 1, store);
        size += child.size();
        num_trees += child.num_trees();
        store.put_tree(&child);
        buckets.insert(
            index,
            Bucket {
                id: child.id(),
                bounds,
            },
        );
    }
    Tree::new(size, num_trees, Vec::new(), Vec::new(), buckets)
}

fn build_leaf(entries: Vec<Entry>) -> Tree {
    let mut trees = Vec::new();
    let mut features = Vec::new();
    let mut size = 0u64;
    let mut num_trees = 0u32;
    for entry in entries {
        size += entry.size;
        num_trees += entry.num_trees;
        match entry.kind {
            NodeKind::Tree => {
                num_trees += 1;
                trees.push(entry.node);
            }
            NodeKind::Feature => features.push(entry.node),
        }
    }
    Tree::new(size, num_trees, trees, features, BTreeMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_id::ObjectId;
    use crate::store::MemoryObjectStore;

    fn feature(name: &str) -> Node {
        Node::new(name, ObjectId::from_content(name.as_bytes()))
    }

    fn bounded_feature(name: &str, x: f64, y: f64) -> Node {
        Node::with_details(
            name,
            ObjectId::from_content(name.as_bytes()),
            None,
            Some(Bounds::point(x, y)),
            BTreeMap::new(),
        )
    }

    /// Walks a tree recursively through the store, collecting feature names.
    fn collect_features<S: ObjectStore>(tree: &Tree, store: &S, out: &mut Vec<String>) {
        for node in tree.features() {
            out.push(node.name().to_string());
        }
        for bucket in tree.buckets().values() {
            let child = store
                .get_tree(&bucket.id)
                .unwrap()
                .expect("bucket subtree must be persisted")
                .to_tree()
                .unwrap();
            collect_features(&child, store, out);
        }
    }

    #[test]
    fn small_build_stays_a_leaf() {
        let mut store = MemoryObjectStore::new();
        let mut builder = TreeBuilder::new();
        for i in 0..100 {
            builder.put(feature(&format!("f{i}")));
        }
        let tree = builder.build(&mut store);
        assert!(tree.is_leaf());
        assert_eq!(tree.size(), 100);
        assert_eq!(tree.features().len(), 100);
        assert!(builder.is_empty());
        // Root is persisted too.
        assert!(store.contains(&tree.id()));
    }

    #[test]
    fn oversized_level_shards_into_buckets() {
        let mut store = MemoryObjectStore::new();
        let mut builder = TreeBuilder::new();
        let count = 600; // past the depth-0 limit of 512
        for i in 0..count {
            builder.put(feature(&format!("f{i}")));
        }
        let tree = builder.build(&mut store);
        assert!(!tree.is_leaf());
        assert!(tree.features().is_empty());
        assert_eq!(tree.size(), count as u64);
        for &index in tree.buckets().keys() {
            assert!(index < storage_order::max_buckets_for_level(0));
        }
        let mut names = Vec::new();
        collect_features(&tree, &store, &mut names);
        names.sort();
        let mut expected: Vec<String> = (0..count).map(|i| format!("f{i}")).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn id_is_independent_of_insertion_order_across_sharding() {
        let names: Vec<String> = (0..700).map(|i| format!("feature-{i}")).collect();
        let mut forward = TreeBuilder::new();
        let mut backward = TreeBuilder::new();
        for name in &names {
            forward.put(feature(name));
        }
        for name in names.iter().rev() {
            backward.put(feature(name));
        }
        let a = forward.build(&mut MemoryObjectStore::new());
        let b = backward.build(&mut MemoryObjectStore::new());
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn put_replaces_by_name() {
        let mut store = MemoryObjectStore::new();
        let mut builder = TreeBuilder::new();
        builder.put(feature("road"));
        let updated = Node::new("road", ObjectId::from_content(b"road v2"));
        builder.put(updated.clone());
        let tree = builder.build(&mut store);
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.features(), std::slice::from_ref(&updated));
    }

    #[test]
    fn remove_drops_a_staged_entry() {
        let mut builder = TreeBuilder::new();
        builder.put(feature("keep"));
        builder.put(feature("drop"));
        assert!(builder.remove("drop"));
        assert!(!builder.remove("drop"));
        let tree = builder.build(&mut MemoryObjectStore::new());
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn tree_entries_aggregate_recursive_totals() {
        let mut store = MemoryObjectStore::new();
        let mut builder = TreeBuilder::new();
        // A subtree entry with 10 features and 2 trees of its own.
        builder.put_tree(feature("roads"), 10, 2);
        builder.put(feature("readme"));
        let tree = builder.build(&mut store);
        assert_eq!(tree.size(), 11);
        assert_eq!(tree.num_trees(), 3);
        assert_eq!(tree.trees().len(), 1);
        assert_eq!(tree.features().len(), 1);
    }

    #[test]
    fn bucket_bounds_cover_their_entries() {
        let mut store = MemoryObjectStore::new();
        let mut builder = TreeBuilder::new();
        for i in 0..600 {
            builder.put(bounded_feature(&format!("f{i}"), f64::from(i), -f64::from(i)));
        }
        let tree = builder.build(&mut store);
        for (index, bucket) in tree.buckets() {
            let bounds = bucket.bounds.expect("every entry has bounds");
            let child = store.get_tree(&bucket.id).unwrap().unwrap().to_tree().unwrap();
            for node in child.features() {
                let point = node.bounds().unwrap();
                assert!(
                    bounds.min_x <= point.min_x && point.max_x <= bounds.max_x,
                    "bucket {index} x range"
                );
                assert!(
                    bounds.min_y <= point.min_y && point.max_y <= bounds.max_y,
                    "bucket {index} y range"
                );
            }
        }
    }
}
