// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Owned encoded tree buffer with lazily-parsed sections.
//!
//! Constructing a [`DataBuffer`] parses only the framing (header and tail).
//! The string table and entry sections are parsed on first use; the string
//! table result is memoized because every section lookup goes through it.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::codec::bucket_set;
use crate::codec::framing::{Header, Tail};
use crate::codec::node_set::NodeSet;
use crate::codec::string_table::StringTable;
use crate::error::DecodeError;
use crate::tree::Bucket;

#[derive(Debug)]
pub(crate) struct DataBuffer {
    data: Box<[u8]>,
    header: Header,
    tail: Tail,
    strings: OnceLock<Result<StringTable, DecodeError>>,
}

impl DataBuffer {
    /// Takes ownership of an encoded tree and parses its framing.
    ///
    /// Rejects buffers that carry both direct entries and buckets; nothing
    /// downstream is prepared to interpret such a tree.
    pub(crate) fn parse(data: Vec<u8>) -> Result<DataBuffer, DecodeError> {
        let (header, _) = Header::parse(&data)?;
        let tail = Tail::parse(&data)?;
        if (tail.off_trees != 0 || tail.off_features != 0) && tail.off_buckets != 0 {
            return Err(DecodeError::MixedTree);
        }
        Ok(DataBuffer {
            data: data.into_boxed_slice(),
            header,
            tail,
            strings: OnceLock::new(),
        })
    }

    pub(crate) fn header(&self) -> Header {
        self.header
    }

    pub(crate) fn has_buckets(&self) -> bool {
        self.tail.off_buckets != 0
    }

    /// The shared string table, parsed once on first use. Concurrent first
    /// uses may both parse; the results are identical.
    pub(crate) fn string_table(&self) -> Result<&StringTable, DecodeError> {
        self.strings
            .get_or_init(|| {
                if self.tail.off_stringtable == 0 {
                    Ok(StringTable::empty())
                } else {
                    StringTable::parse(&self.data, self.tail.off_stringtable)
                }
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The child-tree entry section; an empty set when absent.
    pub(crate) fn trees(&self) -> Result<NodeSet<'_>, DecodeError> {
        self.node_set(self.tail.off_trees)
    }

    /// The feature entry section; an empty set when absent.
    pub(crate) fn features(&self) -> Result<NodeSet<'_>, DecodeError> {
        self.node_set(self.tail.off_features)
    }

    fn node_set(&self, offset: usize) -> Result<NodeSet<'_>, DecodeError> {
        let strings = self.string_table()?;
        if offset == 0 {
            Ok(NodeSet::empty(strings))
        } else {
            NodeSet::parse(&self.data, offset, strings)
        }
    }

    /// The decoded bucket table; empty when absent.
    pub(crate) fn buckets(&self) -> Result<BTreeMap<u8, Bucket>, DecodeError> {
        if self.tail.off_buckets == 0 {
            Ok(BTreeMap::new())
        } else {
            bucket_set::decode(&self.data, self.tail.off_buckets)
        }
    }
}
