// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Inline per-node attribute maps.
//!
//! Each node with extra data points at an offset inside the node set's extra
//! section, where its map is encoded as a count followed by
//! `(key index, tagged value)` pairs. Keys live in the tree's shared string
//! table. Values are skippable, so a single-key lookup walks the map without
//! decoding any value but the match (external index materialization relies
//! on this).

use std::collections::BTreeMap;

use crate::codec::reader::{Reader, WriteBytes};
use crate::codec::string_table::{StringTable, StringTableBuilder};
use crate::error::DecodeError;
use crate::value::Value;

/// Appends one node's map. `BTreeMap` iteration is key-ordered, which keeps
/// the encoding canonical.
pub(crate) fn encode(
    map: &BTreeMap<String, Value>,
    out: &mut Vec<u8>,
    strings: &mut StringTableBuilder,
) {
    out.push_uvarint(map.len() as u64);
    for (key, value) in map {
        out.push_uvarint(u64::from(strings.intern(key)));
        value.write_to(out);
    }
}

/// Decodes the whole map starting at `offset`.
pub(crate) fn decode(
    data: &[u8],
    offset: usize,
    strings: &StringTable,
) -> Result<BTreeMap<String, Value>, DecodeError> {
    let mut reader = Reader::at(data, offset);
    let count = reader.read_uvarint_len("extra data count")?;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key_idx = reader.read_uvarint32("extra data key index")?;
        let key = strings.get(key_idx)?.to_string();
        let value = Value::read_from(&mut reader)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Point lookup of a single key; decodes only the matching value.
pub(crate) fn get(
    data: &[u8],
    offset: usize,
    strings: &StringTable,
    key: &str,
) -> Result<Option<Value>, DecodeError> {
    // A key missing from the string table can't be in any map.
    let Some(wanted) = strings.index_of(key) else {
        return Ok(None);
    };
    let mut reader = Reader::at(data, offset);
    let count = reader.read_uvarint_len("extra data count")?;
    for _ in 0..count {
        let key_idx = reader.read_uvarint32("extra data key index")?;
        if key_idx == wanted {
            return Value::read_from(&mut reader).map(Some);
        }
        Value::skip(&mut reader)?;
    }
    Ok(None)
}
