// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Buffer framing: the leading header and the trailing offset table.
//!
//! The header carries the object tag and the recursive totals, so size
//! queries never touch the entry sections. The tail carries the offsets of
//! the four optional sections; it sits at the end of the buffer, located
//! through a fixed-width back-pointer in the last four bytes, because the
//! section offsets are only known once the sections are written.

use crate::codec::reader::{Reader, WriteBytes};
use crate::error::DecodeError;

/// Object tag for a tree buffer; the first byte of every encoding.
pub(crate) const OBJECT_TAG_TREE: u8 = 0x01;

/// Decoded buffer header: the tag byte plus the recursive totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    /// Total number of features under this tree, recursively.
    pub total_size: u64,
    /// Total number of child trees under this tree, recursively.
    pub num_trees: u32,
}

impl Header {
    pub(crate) fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(OBJECT_TAG_TREE);
        out.push_uvarint(self.total_size);
        out.push_uvarint(u64::from(self.num_trees));
    }

    pub(crate) fn parse(data: &[u8]) -> Result<(Header, usize), DecodeError> {
        let mut reader = Reader::new(data);
        let tag = reader.read_u8("object tag")?;
        if tag != OBJECT_TAG_TREE {
            return Err(DecodeError::UnexpectedType { found: tag });
        }
        let total_size = reader.read_uvarint("total size")?;
        let num_trees = reader.read_uvarint32("tree count")?;
        Ok((
            Header {
                total_size,
                num_trees,
            },
            reader.pos(),
        ))
    }
}

/// Decoded offset table. A zero offset means the section is absent; the
/// header byte at offset 0 guarantees no real section can start there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tail {
    pub off_trees: usize,
    pub off_features: usize,
    pub off_buckets: usize,
    pub off_stringtable: usize,
}

impl Tail {
    /// Appends the offset table and the back-pointer; must be the last
    /// write into the buffer.
    pub(crate) fn encode_to(&self, out: &mut Vec<u8>) {
        let tail_start = out.len();
        out.push_uvarint(self.off_trees as u64);
        out.push_uvarint(self.off_features as u64);
        out.push_uvarint(self.off_buckets as u64);
        out.push_uvarint(self.off_stringtable as u64);
        out.push_i32_be(tail_start as i32);
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Tail, DecodeError> {
        if data.len() < 4 {
            return Err(DecodeError::IncompleteItem {
                item: "tail pointer",
                offset: 0,
                expected: 4,
                found: data.len(),
            });
        }
        let pointer_at = data.len() - 4;
        let tail_start = Reader::at(data, pointer_at).read_i32_be("tail pointer")?;
        if tail_start < 0 || tail_start as usize >= pointer_at {
            return Err(DecodeError::InvalidItem {
                item: "tail pointer",
                offset: pointer_at,
                expected: "an offset inside the buffer, before the pointer",
                found: tail_start.to_string(),
            });
        }
        let mut reader = Reader::at(data, tail_start as usize);
        Ok(Tail {
            off_trees: reader.read_uvarint_len("tree section offset")?,
            off_features: reader.read_uvarint_len("feature section offset")?,
            off_buckets: reader.read_uvarint_len("bucket section offset")?,
            off_stringtable: reader.read_uvarint_len("string table offset")?,
        })
    }
}
