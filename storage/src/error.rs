// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Error types surfaced while decoding tree buffers.
//!
//! Decoding is a pure function over an in-memory byte region: nothing here is
//! retried or recovered locally. Every error propagates to the object-store
//! layer, which owns the policy for corrupt or missing objects.

/// Error that occurred while decoding a tree object buffer.
///
/// Truncation ([`DecodeError::IncompleteItem`]) and inconsistency
/// ([`DecodeError::InvalidItem`] and friends) are kept distinct from
/// cross-table lookups that fail ([`DecodeError::StringIndexOutOfBounds`],
/// [`DecodeError::OidIndexOutOfBounds`]): the latter mean a node view and its
/// backing table disagree, which is always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Insufficient data in the byte region.
    #[error("incomplete {item} at offset {offset}: expected {expected} bytes, but found {found}")]
    IncompleteItem {
        /// The specific item that was being parsed.
        item: &'static str,
        /// The offset in the byte region where the error occurred.
        offset: usize,
        /// The number of bytes the item needed.
        expected: usize,
        /// The number of bytes remaining.
        found: usize,
    },

    /// An item was present but invalid after parsing.
    #[error("invalid {item} at offset {offset}: expected {expected}, but found {found}")]
    InvalidItem {
        /// The item that was being parsed.
        item: &'static str,
        /// The offset in the byte region where the error occurred.
        offset: usize,
        /// A hint at what was expected.
        expected: &'static str,
        /// What was actually found.
        found: String,
    },

    /// The object-type tag did not identify a tree.
    #[error("unexpected object type tag: found {found:#04x}, expected a tree")]
    UnexpectedType {
        /// The tag byte found at the start of the buffer.
        found: u8,
    },

    /// The buffer carries both direct node sets and a bucket set.
    ///
    /// A persisted tree is a leaf tree or a bucket tree, never both; a buffer
    /// that violates this was produced by a buggy or hostile writer.
    #[error("tree buffer has both direct nodes and buckets; a persisted tree must be one or the other")]
    MixedTree,

    /// The same bucket index appeared twice in a bucket set.
    #[error("duplicate bucket index {index} in bucket set")]
    DuplicateBucketIndex {
        /// The repeated index.
        index: u8,
    },

    /// A node referenced a string table index past the end of the table.
    #[error("string table index {index} out of bounds (table has {len} entries)")]
    StringIndexOutOfBounds {
        /// The index that was requested.
        index: u32,
        /// The number of entries in the string table.
        len: u32,
    },

    /// A node referenced an object-id table index past the end of the table.
    #[error("object id table index {index} out of bounds (table has {len} entries)")]
    OidIndexOutOfBounds {
        /// The index that was requested.
        index: u32,
        /// The number of entries in the object-id table.
        len: u32,
    },

    /// A string table entry held bytes that are not valid UTF-8.
    #[error("string table entry at offset {offset} is not valid utf-8")]
    InvalidUtf8 {
        /// The offset of the offending entry.
        offset: usize,
    },
}

impl DecodeError {
    /// Shifts the recorded offset of this error by `offset` bytes.
    ///
    /// Used when a section parser operates on a slice of the full buffer and
    /// the caller wants errors reported in whole-buffer coordinates.
    #[must_use]
    pub fn add_offset(mut self, offset: usize) -> Self {
        match &mut self {
            DecodeError::IncompleteItem {
                offset: err_offset, ..
            }
            | DecodeError::InvalidItem {
                offset: err_offset, ..
            }
            | DecodeError::InvalidUtf8 { offset: err_offset } => {
                *err_offset = err_offset.saturating_add(offset);
            }
            DecodeError::UnexpectedType { .. }
            | DecodeError::MixedTree
            | DecodeError::DuplicateBucketIndex { .. }
            | DecodeError::StringIndexOutOfBounds { .. }
            | DecodeError::OidIndexOutOfBounds { .. } => {}
        }
        self
    }
}
