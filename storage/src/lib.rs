// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(
    not(target_pointer_width = "64"),
    forbid(
        clippy::cast_possible_truncation,
        reason = "non-64 bit target likely to cause issues during u64 to usize conversions"
    )
)]

//! # storage implements content-addressed, hash-sharded feature trees
//!
//! A [`Tree`] names child subtrees and leaf features; its [`ObjectId`] is
//! the hash of its own canonical encoding, so equal trees share one id no
//! matter how they were assembled. Oversized levels are sharded into bucket
//! subtrees by [`storage_order`], keeping ids and diffs stable as data
//! grows.
//!
//! [`encode_tree`] and [`decode_tree`] convert between [`Tree`] and the
//! canonical buffer; a [`StoredTree`] reads entries straight out of the
//! buffer without materializing them. [`TreeBuilder`] assembles canonical
//! trees from unsorted entries, persisting bucket subtrees into an
//! [`ObjectStore`].

mod bounds;
mod codec;
mod error;
mod node;
mod object_id;
mod store;
mod tree;
mod value;

/// Logger module for handling logging functionality
pub mod logger;

/// Storage order of entries: name hashing, bucket assignment, fan-out.
pub mod storage_order;

// re-export these so callers don't need to know where they are
pub use bounds::Bounds;
pub use codec::{MAX_BUCKETS, NodeIter, NodeSet, NodeView, decode_tree, encode_tree};
pub use error::DecodeError;
pub use node::Node;
pub use object_id::{InvalidObjectIdLength, ObjectId};
pub use store::{MemoryObjectStore, ObjectStore};
pub use tree::{Bucket, StoredTree, Tree, TreeBuilder};
pub use value::Value;
