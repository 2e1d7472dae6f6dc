// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Codec for the (possibly large) list of child-tree or feature entries.
//!
//! The encoded section is: a fixed header (counts, per-node flag nibbles,
//! section sizes), a varint-packed per-node record stream, a deduplicated
//! object-id table, a packed bounds coordinate sequence, and an inline
//! extra-data area. Object and metadata ids repeat heavily in practice
//! (thousands of features sharing one feature-type id), so records store
//! table indices, never raw 20-byte ids.
//!
//! Decoding is lazy: constructing a [`NodeSet`] parses only the header.
//! Entries are exposed as [`NodeView`]s that re-read the relevant slice on
//! every accessor call; nothing is materialized up front.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use bitflags::bitflags;

use crate::bounds::Bounds;
use crate::codec::coords::{self, CoordSeq};
use crate::codec::extra_data;
use crate::codec::reader::{Reader, WriteBytes};
use crate::codec::string_table::{StringTable, StringTableBuilder};
use crate::error::DecodeError;
use crate::node::Node;
use crate::object_id::ObjectId;
use crate::value::Value;

bitflags! {
    /// Per-node presence flags; one nibble per node in the flags vector.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u8 {
        const METADATA = 0b0001;
        const BOUNDS = 0b0010;
        const POINT_BOUNDS = 0b0100;
        const EXTRA_DATA = 0b1000;
    }
}

fn flags_at(flags: &[u8], index: u32) -> Result<NodeFlags, DecodeError> {
    let byte = flags
        .get((index / 2) as usize)
        .ok_or(DecodeError::IncompleteItem {
            item: "node flags",
            offset: 0,
            expected: (index / 2 + 1) as usize,
            found: flags.len(),
        })?;
    let nibble = if index % 2 == 0 { byte & 0x0F } else { byte >> 4 };
    Ok(NodeFlags::from_bits_truncate(nibble))
}

fn set_flags(flags: &mut [u8], index: usize, value: NodeFlags) {
    if let Some(byte) = flags.get_mut(index / 2) {
        if index % 2 == 0 {
            *byte |= value.bits();
        } else {
            *byte |= value.bits() << 4;
        }
    }
}

/// Appends the encoded node set for `nodes`, interning names and extra-data
/// keys into `strings`.
///
/// Entries are expected to already be in storage order; the codec writes
/// them as given.
pub(crate) fn encode(nodes: &[Node], out: &mut Vec<u8>, strings: &mut StringTableBuilder) {
    let mut flags = vec![0u8; nodes.len().div_ceil(2)];
    let mut node_data: Vec<u8> = Vec::with_capacity(nodes.len() * 4);
    let mut oid_table: Vec<u8> = Vec::new();
    let mut oid_index: HashMap<ObjectId, u32> = HashMap::new();
    let mut bounds_coords: Vec<(f64, f64)> = Vec::new();
    let mut extra: Vec<u8> = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let mut node_flags = NodeFlags::empty();

        let name_idx = strings.intern(node.name());
        let oid_idx = intern_oid(node.id(), &mut oid_index, &mut oid_table);
        node_data.push_uvarint(u64::from(name_idx));
        node_data.push_uvarint(u64::from(oid_idx));

        if let Some(metadata_id) = node.metadata_id() {
            node_flags |= NodeFlags::METADATA;
            let md_idx = intern_oid(metadata_id, &mut oid_index, &mut oid_table);
            node_data.push_uvarint(u64::from(md_idx));
        }

        if let Some(bounds) = node.bounds() {
            node_flags |= NodeFlags::BOUNDS;
            let bounds_idx = bounds_coords.len();
            bounds_coords.push((bounds.min_x, bounds.min_y));
            if bounds.is_point() {
                node_flags |= NodeFlags::POINT_BOUNDS;
            } else {
                bounds_coords.push((bounds.max_x, bounds.max_y));
            }
            node_data.push_uvarint(bounds_idx as u64);
        }

        if !node.extra_data().is_empty() {
            node_flags |= NodeFlags::EXTRA_DATA;
            let rel_offset = extra.len();
            extra_data::encode(node.extra_data(), &mut extra, strings);
            node_data.push_uvarint(rel_offset as u64);
        }

        set_flags(&mut flags, index, node_flags);
    }

    let mut bounds_stream: Vec<u8> = Vec::new();
    if !bounds_coords.is_empty() {
        coords::encode(&bounds_coords, &mut bounds_stream);
    }

    // Header: its length prefix counts itself, so a reader can jump straight
    // to the record stream.
    let mut body: Vec<u8> = Vec::with_capacity(12 + flags.len());
    body.push_u32_be(nodes.len() as u32);
    body.push_u32_be(flags.len() as u32);
    body.extend_from_slice(&flags);
    body.push_uvarint(node_data.len() as u64);
    body.push_uvarint(oid_table.len() as u64);
    body.push_uvarint(bounds_stream.len() as u64);
    body.push_uvarint(extra.len() as u64);

    out.push_u32_be((4 + body.len()) as u32);
    out.extend_from_slice(&body);
    out.extend_from_slice(&node_data);
    out.extend_from_slice(&oid_table);
    out.extend_from_slice(&bounds_stream);
    out.extend_from_slice(&extra);
}

fn intern_oid(id: ObjectId, index: &mut HashMap<ObjectId, u32>, table: &mut Vec<u8>) -> u32 {
    if let Some(&existing) = index.get(&id) {
        return existing;
    }
    let idx = (table.len() / ObjectId::NUM_BYTES) as u32;
    table.push_object_id(&id);
    index.insert(id, idx);
    idx
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeSetHeader<'a> {
    num_nodes: u32,
    flags: &'a [u8],
    node_data_offset: usize,
    oid_table_offset: usize,
    oid_table_len: usize,
    bounds_offset: usize,
    bounds_len: usize,
    extra_offset: usize,
}

/// A lazily-decoded list of entries inside a tree buffer.
#[derive(Debug)]
pub struct NodeSet<'a> {
    data: &'a [u8],
    strings: &'a StringTable,
    header: NodeSetHeader<'a>,
    coords: OnceLock<Result<CoordSeq, DecodeError>>,
}

impl<'a> NodeSet<'a> {
    /// Parses only the fixed-size section header at `offset`.
    pub(crate) fn parse(
        data: &'a [u8],
        offset: usize,
        strings: &'a StringTable,
    ) -> Result<NodeSet<'a>, DecodeError> {
        let mut reader = Reader::at(data, offset);
        let header_len = reader.read_u32_be("node set header length")? as usize;
        let num_nodes = reader.read_u32_be("node count")?;
        let flags_len = reader.read_u32_be("node flags length")? as usize;
        let flags = reader.read_bytes(flags_len, "node flags")?;
        let node_data_len = reader.read_uvarint_len("node data length")?;
        let oid_table_len = reader.read_uvarint_len("object id table length")?;
        let bounds_len = reader.read_uvarint_len("bounds length")?;
        let extra_len = reader.read_uvarint_len("extra data length")?;

        if reader.pos() != offset + header_len {
            return Err(DecodeError::InvalidItem {
                item: "node set header",
                offset,
                expected: "header length matching its contents",
                found: format!("declared {header_len}, parsed {}", reader.pos() - offset),
            });
        }
        if (flags_len as u64) < u64::from(num_nodes.div_ceil(2)) {
            return Err(DecodeError::InvalidItem {
                item: "node flags",
                offset,
                expected: "one flag nibble per node",
                found: format!("{flags_len} bytes for {num_nodes} nodes"),
            });
        }

        let node_data_offset = offset + header_len;
        let oid_table_offset = node_data_offset + node_data_len;
        let bounds_offset = oid_table_offset + oid_table_len;
        let extra_offset = bounds_offset + bounds_len;
        let end = extra_offset + extra_len;
        if end > data.len() {
            return Err(DecodeError::IncompleteItem {
                item: "node set sections",
                offset,
                expected: end - offset,
                found: data.len().saturating_sub(offset),
            });
        }

        Ok(NodeSet {
            data,
            strings,
            header: NodeSetHeader {
                num_nodes,
                flags,
                node_data_offset,
                oid_table_offset,
                oid_table_len,
                bounds_offset,
                bounds_len,
                extra_offset,
            },
            coords: OnceLock::new(),
        })
    }

    /// A set with no entries, used for absent sections.
    pub(crate) fn empty(strings: &'a StringTable) -> NodeSet<'a> {
        NodeSet {
            data: &[],
            strings,
            header: NodeSetHeader::default(),
            coords: OnceLock::new(),
        }
    }

    /// The number of entries, available without decoding any of them.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.header.num_nodes
    }

    /// True if this set holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.num_nodes == 0
    }

    /// The number of distinct ids in the deduplicated object-id table.
    #[must_use]
    pub fn oid_table_len(&self) -> u32 {
        (self.header.oid_table_len / ObjectId::NUM_BYTES) as u32
    }

    /// Iterates entry views in storage order.
    pub fn iter(&self) -> NodeIter<'_, 'a> {
        NodeIter {
            set: self,
            reader: Reader::at(self.data, self.header.node_data_offset),
            index: 0,
        }
    }

    /// The view of the entry at `index`, scanning the record stream up to it.
    ///
    /// # Errors
    ///
    /// Fails if the record stream is truncated or `index` is out of range.
    pub fn get(&self, index: u32) -> Result<NodeView<'_, 'a>, DecodeError> {
        self.iter()
            .nth(index as usize)
            .unwrap_or_else(|| Err(DecodeError::InvalidItem {
                item: "node index",
                offset: self.header.node_data_offset,
                expected: "an index within the node set",
                found: format!("{index} of {}", self.len()),
            }))
    }

    /// Eagerly materializes every entry.
    ///
    /// # Errors
    ///
    /// Fails on any malformed record or table lookup.
    pub fn build(&self) -> Result<Vec<Node>, DecodeError> {
        self.iter().map(|view| view?.to_node()).collect()
    }

    fn object_id(&self, index: u32) -> Result<ObjectId, DecodeError> {
        if index >= self.oid_table_len() {
            return Err(DecodeError::OidIndexOutOfBounds {
                index,
                len: self.oid_table_len(),
            });
        }
        let offset = self.header.oid_table_offset + ObjectId::NUM_BYTES * index as usize;
        Reader::at(self.data, offset).read_object_id("object id")
    }

    fn coord_seq(&self) -> Result<&CoordSeq, DecodeError> {
        // Races here at worst recompute the same value; never wrong results.
        self.coords
            .get_or_init(|| {
                if self.header.bounds_len == 0 {
                    Ok(CoordSeq::default())
                } else {
                    CoordSeq::parse(self.data, self.header.bounds_offset)
                }
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Iterator over [`NodeView`]s; each step parses one fixed record from the
/// stream. Fuses after the first error.
#[derive(Debug)]
pub struct NodeIter<'s, 'a> {
    set: &'s NodeSet<'a>,
    reader: Reader<'a>,
    index: u32,
}

impl<'s, 'a> Iterator for NodeIter<'s, 'a> {
    type Item = Result<NodeView<'s, 'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.set.len() {
            return None;
        }
        let result = self.parse_one();
        if result.is_err() {
            self.index = self.set.len();
        } else {
            self.index += 1;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.set.len() - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl<'s, 'a> NodeIter<'s, 'a> {
    fn parse_one(&mut self) -> Result<NodeView<'s, 'a>, DecodeError> {
        let flags = flags_at(self.set.header.flags, self.index)?;
        let name_idx = self.reader.read_uvarint32("node name index")?;
        let oid_idx = self.reader.read_uvarint32("node object id index")?;
        let md_idx = if flags.contains(NodeFlags::METADATA) {
            Some(self.reader.read_uvarint32("node metadata id index")?)
        } else {
            None
        };
        let bounds_idx = if flags.contains(NodeFlags::BOUNDS) {
            Some(self.reader.read_uvarint32("node bounds index")?)
        } else {
            None
        };
        let extra_offset = if flags.contains(NodeFlags::EXTRA_DATA) {
            Some(self.reader.read_uvarint32("node extra data offset")?)
        } else {
            None
        };
        Ok(NodeView {
            set: self.set,
            flags,
            name_idx,
            oid_idx,
            md_idx,
            bounds_idx,
            extra_offset,
        })
    }
}

/// A lightweight, lazily-decoding view of one entry.
///
/// Each accessor re-reads the relevant slice of the backing region through
/// its own cursor; views are freely shareable across threads for as long as
/// the backing region lives.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'s, 'a> {
    set: &'s NodeSet<'a>,
    flags: NodeFlags,
    name_idx: u32,
    oid_idx: u32,
    md_idx: Option<u32>,
    bounds_idx: Option<u32>,
    extra_offset: Option<u32>,
}

impl<'s, 'a> NodeView<'s, 'a> {
    /// The entry name.
    ///
    /// # Errors
    ///
    /// Fails if the name index and the string table disagree.
    pub fn name(&self) -> Result<&'a str, DecodeError> {
        self.set.strings.get(self.name_idx)
    }

    /// The referenced object's id.
    ///
    /// # Errors
    ///
    /// Fails if the id index and the object-id table disagree.
    pub fn id(&self) -> Result<ObjectId, DecodeError> {
        self.set.object_id(self.oid_idx)
    }

    /// The metadata id, if present.
    ///
    /// # Errors
    ///
    /// Fails if the id index and the object-id table disagree.
    pub fn metadata_id(&self) -> Result<Option<ObjectId>, DecodeError> {
        self.md_idx.map(|idx| self.set.object_id(idx)).transpose()
    }

    /// The entry bounds, if present. Point boxes are stored as a single
    /// coordinate and reconstructed here.
    ///
    /// # Errors
    ///
    /// Fails if the bounds index points outside the packed sequence.
    pub fn bounds(&self) -> Result<Option<Bounds>, DecodeError> {
        let Some(bounds_idx) = self.bounds_idx else {
            return Ok(None);
        };
        let seq = self.set.coord_seq()?;
        let missing = |index: usize| DecodeError::InvalidItem {
            item: "bounds index",
            offset: self.set.header.bounds_offset,
            expected: "an index within the packed coordinate sequence",
            found: format!("{index} of {}", seq.len()),
        };
        let index = bounds_idx as usize;
        let (min_x, min_y) = seq.get(index).ok_or_else(|| missing(index))?;
        if self.flags.contains(NodeFlags::POINT_BOUNDS) {
            return Ok(Some(Bounds::point(min_x, min_y)));
        }
        let (max_x, max_y) = seq.get(index + 1).ok_or_else(|| missing(index + 1))?;
        Ok(Some(Bounds::new(min_x, max_x, min_y, max_y)))
    }

    /// Decodes the full extra-data map for this entry.
    ///
    /// # Errors
    ///
    /// Fails on malformed inline data or a key index the string table
    /// cannot resolve.
    pub fn extra_data(&self) -> Result<BTreeMap<String, Value>, DecodeError> {
        match self.extra_offset {
            None => Ok(BTreeMap::new()),
            Some(rel) => extra_data::decode(
                self.set.data,
                self.set.header.extra_offset + rel as usize,
                self.set.strings,
            ),
        }
    }

    /// Looks up a single extra-data key without decoding the rest of the
    /// map.
    ///
    /// # Errors
    ///
    /// Fails on malformed inline data.
    pub fn extra(&self, key: &str) -> Result<Option<Value>, DecodeError> {
        match self.extra_offset {
            None => Ok(None),
            Some(rel) => extra_data::get(
                self.set.data,
                self.set.header.extra_offset + rel as usize,
                self.set.strings,
                key,
            ),
        }
    }

    /// Materializes an owned [`Node`] from this view.
    ///
    /// # Errors
    ///
    /// Fails on any lookup the lazy accessors could fail on.
    pub fn to_node(&self) -> Result<Node, DecodeError> {
        Ok(Node::with_details(
            self.name()?,
            self.id()?,
            self.metadata_id()?,
            self.bounds()?,
            self.extra_data()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_type_id() -> ObjectId {
        ObjectId::from_content(b"roads feature type")
    }

    fn sample_nodes() -> Vec<Node> {
        vec![
            Node::with_details(
                "roads/1",
                ObjectId::from_content(b"roads/1 v1"),
                Some(feature_type_id()),
                Some(Bounds::new(-10.0, 10.0, -5.0, 5.0)),
                BTreeMap::from([("lanes".to_string(), Value::Int(2))]),
            ),
            Node::with_details(
                "roads/2",
                ObjectId::from_content(b"roads/2 v1"),
                Some(feature_type_id()),
                Some(Bounds::point(1.25, -3.5)),
                BTreeMap::new(),
            ),
            Node::new("roads/3", ObjectId::from_content(b"roads/3 v1")),
        ]
    }

    fn encode_set(nodes: &[Node]) -> (Vec<u8>, StringTable) {
        let mut strings = StringTableBuilder::new();
        let mut out = vec![0xEEu8; 7]; // nonzero section offset
        encode(nodes, &mut out, &mut strings);
        let mut table_bytes = Vec::new();
        strings.encode_to(&mut table_bytes);
        (out, StringTable::parse(&table_bytes, 0).unwrap())
    }

    #[test]
    fn lazy_views_match_source_nodes() {
        let nodes = sample_nodes();
        let (out, strings) = encode_set(&nodes);
        let set = NodeSet::parse(&out, 7, &strings).unwrap();
        assert_eq!(set.len() as usize, nodes.len());
        for (view, node) in set.iter().zip(&nodes) {
            let view = view.unwrap();
            assert_eq!(view.name().unwrap(), node.name());
            assert_eq!(view.id().unwrap(), node.id());
            assert_eq!(view.metadata_id().unwrap(), node.metadata_id());
            assert_eq!(view.bounds().unwrap(), node.bounds());
            assert_eq!(&view.extra_data().unwrap(), node.extra_data());
            assert_eq!(&view.to_node().unwrap(), node);
        }
    }

    #[test]
    fn shared_ids_are_deduplicated() {
        let shared = ObjectId::from_content(b"shared");
        let nodes: Vec<Node> = (0..10)
            .map(|i| {
                Node::with_details(
                    format!("f{i}"),
                    shared,
                    Some(feature_type_id()),
                    None,
                    BTreeMap::new(),
                )
            })
            .collect();
        let (out, strings) = encode_set(&nodes);
        let set = NodeSet::parse(&out, 7, &strings).unwrap();
        // 10 object ids + 10 metadata ids collapse to 2 table entries.
        assert_eq!(set.oid_table_len(), 2);
        for view in set.iter() {
            let view = view.unwrap();
            assert_eq!(view.id().unwrap(), shared);
            assert_eq!(view.metadata_id().unwrap(), Some(feature_type_id()));
        }
    }

    #[test]
    fn point_bounds_take_one_coordinate() {
        let point = Node::with_details(
            "p",
            ObjectId::from_content(b"p"),
            None,
            Some(Bounds::point(2.0, 3.0)),
            BTreeMap::new(),
        );
        let boxed = Node::with_details(
            "b",
            ObjectId::from_content(b"b"),
            None,
            Some(Bounds::new(0.0, 1.0, 0.0, 1.0)),
            BTreeMap::new(),
        );
        let (out, strings) = encode_set(&[point.clone(), boxed.clone()]);
        let set = NodeSet::parse(&out, 7, &strings).unwrap();
        assert_eq!(set.get(0).unwrap().bounds().unwrap(), point.bounds());
        assert_eq!(set.get(1).unwrap().bounds().unwrap(), boxed.bounds());
        // One coordinate for the point, two for the box.
        assert_eq!(set.coord_seq().unwrap().len(), 3);
    }

    #[test]
    fn single_key_extra_lookup() {
        let nodes = sample_nodes();
        let (out, strings) = encode_set(&nodes);
        let set = NodeSet::parse(&out, 7, &strings).unwrap();
        let first = set.get(0).unwrap();
        assert_eq!(first.extra("lanes").unwrap(), Some(Value::Int(2)));
        assert_eq!(first.extra("absent").unwrap(), None);
        let second = set.get(1).unwrap();
        assert_eq!(second.extra("lanes").unwrap(), None);
    }

    #[test]
    fn truncated_section_is_rejected_at_parse() {
        let nodes = sample_nodes();
        let (out, strings) = encode_set(&nodes);
        let truncated = &out[..out.len() - 1];
        assert!(matches!(
            NodeSet::parse(truncated, 7, &strings),
            Err(DecodeError::IncompleteItem { .. })
        ));
    }

    #[test]
    fn empty_set_has_no_entries() {
        let strings = StringTable::empty();
        let set = NodeSet::empty(&strings);
        assert!(set.is_empty());
        assert!(set.iter().next().is_none());
        assert!(set.get(0).is_err());
    }
}
