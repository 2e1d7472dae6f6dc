// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The per-tree deduplicated string pool.
//!
//! One table is shared by every section of an encoded tree: node names, and
//! extra-data keys all refer to it by index. The mutable builder variant is
//! confined to a single encode call; the decoded variant is read-only and
//! parsed lazily from its section.

use std::collections::HashMap;

use crate::codec::reader::{Reader, WriteBytes};
use crate::error::DecodeError;

/// Encode-side string pool: assigns indices on first occurrence.
///
/// Owned exclusively by one encode operation; never shared across concurrent
/// encodes.
#[derive(Debug, Default)]
pub(crate) struct StringTableBuilder {
    index: HashMap<String, u32>,
    entries: Vec<String>,
}

impl StringTableBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `value`, adding it if not yet present.
    pub(crate) fn intern(&mut self, value: &str) -> u32 {
        if let Some(&existing) = self.index.get(value) {
            return existing;
        }
        let idx = self.entries.len() as u32;
        self.entries.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        idx
    }

    /// Appends the encoded table: a count followed by length-prefixed UTF-8
    /// strings in index order.
    pub(crate) fn encode_to(&self, out: &mut Vec<u8>) {
        out.push_uvarint(self.entries.len() as u64);
        for entry in &self.entries {
            out.push_uvarint(entry.len() as u64);
            out.extend_from_slice(entry.as_bytes());
        }
    }
}

/// Decode-side string pool: read-only, index lookups only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StringTable {
    entries: Vec<String>,
}

impl StringTable {
    /// An empty table, used when a buffer carries no string section.
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Parses the table from its section at `offset`.
    pub(crate) fn parse(data: &[u8], offset: usize) -> Result<StringTable, DecodeError> {
        let mut reader = Reader::at(data, offset);
        let count = reader.read_uvarint_len("string table count")?;
        let mut entries = Vec::with_capacity(count.min(data.len()));
        for _ in 0..count {
            let len = reader.read_uvarint_len("string length")?;
            let at = reader.pos();
            let bytes = reader.read_bytes(len, "string bytes")?;
            let text =
                std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset: at })?;
            entries.push(text.to_string());
        }
        Ok(StringTable { entries })
    }

    pub(crate) fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Resolves an index recorded by some other section of the same buffer.
    ///
    /// An out-of-range index means the buffer's sections disagree with each
    /// other, which is fatal for the decode.
    pub(crate) fn get(&self, index: u32) -> Result<&str, DecodeError> {
        self.entries
            .get(index as usize)
            .map(String::as_str)
            .ok_or(DecodeError::StringIndexOutOfBounds {
                index,
                len: self.len(),
            })
    }

    /// Reverse lookup; `None` when the string is not in the pool.
    pub(crate) fn index_of(&self, value: &str) -> Option<u32> {
        self.entries
            .iter()
            .position(|e| e == value)
            .map(|i| i as u32)
    }
}
