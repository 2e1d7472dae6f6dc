// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Byte-cursor primitives shared by every section codec.
//!
//! A [`Reader`] is a cheap, thread-local cursor over a shared read-only byte
//! region. Accessors that decode lazily each construct their own reader
//! ("duplicate, don't share"): position state never crosses call sites, so
//! any number of views may read the same region concurrently.

use integer_encoding::VarInt;

use crate::error::DecodeError;
use crate::object_id::ObjectId;

/// A read cursor over an immutable byte region.
///
/// All reads are bounds-checked and report truncation as
/// [`DecodeError::IncompleteItem`] with the absolute offset at which the
/// read was attempted.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Reader { data, pos }
    }

    /// The current absolute offset.
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    fn incomplete(&self, item: &'static str, expected: usize) -> DecodeError {
        DecodeError::IncompleteItem {
            item,
            offset: self.pos,
            expected,
            found: self.rest().len(),
        }
    }

    pub(crate) fn read_u8(&mut self, item: &'static str) -> Result<u8, DecodeError> {
        let byte = *self
            .rest()
            .first()
            .ok_or_else(|| self.incomplete(item, 1))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_bytes(
        &mut self,
        len: usize,
        item: &'static str,
    ) -> Result<&'a [u8], DecodeError> {
        let rest = self.rest();
        let bytes = rest.get(..len).ok_or_else(|| self.incomplete(item, len))?;
        self.pos += len;
        Ok(bytes)
    }

    pub(crate) fn read_array<const N: usize>(
        &mut self,
        item: &'static str,
    ) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N, item)?;
        let array: [u8; N] = bytes.try_into().map_err(|_| self.incomplete(item, N))?;
        Ok(array)
    }

    pub(crate) fn read_u32_be(&mut self, item: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array::<4>(item)?))
    }

    pub(crate) fn read_i32_be(&mut self, item: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array::<4>(item)?))
    }

    pub(crate) fn read_f32_be(&mut self, item: &'static str) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.read_array::<4>(item)?))
    }

    pub(crate) fn read_f64_be(&mut self, item: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array::<8>(item)?))
    }

    pub(crate) fn read_object_id(&mut self, item: &'static str) -> Result<ObjectId, DecodeError> {
        Ok(ObjectId::from(self.read_array::<{ ObjectId::NUM_BYTES }>(item)?))
    }

    /// Reads an unsigned LEB128 varint.
    pub(crate) fn read_uvarint(&mut self, item: &'static str) -> Result<u64, DecodeError> {
        let (value, size) = u64::decode_var(self.rest()).ok_or_else(|| self.incomplete(item, 1))?;
        self.pos += size;
        Ok(value)
    }

    /// Reads an unsigned varint that must fit a `u32`.
    pub(crate) fn read_uvarint32(&mut self, item: &'static str) -> Result<u32, DecodeError> {
        let start = self.pos;
        let value = self.read_uvarint(item)?;
        u32::try_from(value).map_err(|_| DecodeError::InvalidItem {
            item,
            offset: start,
            expected: "a value that fits in 32 bits",
            found: value.to_string(),
        })
    }

    /// Reads an unsigned varint that must fit a `usize`.
    pub(crate) fn read_uvarint_len(&mut self, item: &'static str) -> Result<usize, DecodeError> {
        let start = self.pos;
        let value = self.read_uvarint(item)?;
        usize::try_from(value).map_err(|_| DecodeError::InvalidItem {
            item,
            offset: start,
            expected: "a length that fits in memory",
            found: value.to_string(),
        })
    }

    /// Reads a zigzag-encoded signed varint.
    pub(crate) fn read_svarint(&mut self, item: &'static str) -> Result<i64, DecodeError> {
        let (value, size) = i64::decode_var(self.rest()).ok_or_else(|| self.incomplete(item, 1))?;
        self.pos += size;
        Ok(value)
    }

    pub(crate) fn read_svarint32(&mut self, item: &'static str) -> Result<i32, DecodeError> {
        let start = self.pos;
        let value = self.read_svarint(item)?;
        i32::try_from(value).map_err(|_| DecodeError::InvalidItem {
            item,
            offset: start,
            expected: "a value that fits in 32 bits",
            found: value.to_string(),
        })
    }
}

/// Write-side counterparts on a plain byte vector.
pub(crate) trait WriteBytes {
    fn push_uvarint(&mut self, value: u64);
    fn push_svarint(&mut self, value: i64);
    fn push_u32_be(&mut self, value: u32);
    fn push_i32_be(&mut self, value: i32);
    fn push_f32_be(&mut self, value: f32);
    fn push_f64_be(&mut self, value: f64);
    fn push_object_id(&mut self, id: &ObjectId);
}

impl WriteBytes for Vec<u8> {
    fn push_uvarint(&mut self, value: u64) {
        let mut buf = [0u8; 10];
        let n = value.encode_var(&mut buf);
        self.extend_from_slice(&buf[..n]);
    }

    fn push_svarint(&mut self, value: i64) {
        let mut buf = [0u8; 10];
        let n = value.encode_var(&mut buf);
        self.extend_from_slice(&buf[..n]);
    }

    fn push_u32_be(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_i32_be(&mut self, value: i32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_f32_be(&mut self, value: f32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_f64_be(&mut self, value: f64) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_object_id(&mut self, id: &ObjectId) {
        self.extend_from_slice(id.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_round_trip() {
        let mut out = Vec::new();
        out.push_uvarint(0);
        out.push_uvarint(300);
        out.push_uvarint(u64::MAX);
        out.push_svarint(-1);
        out.push_svarint(1 << 40);
        let mut r = Reader::new(&out);
        assert_eq!(r.read_uvarint("a").unwrap(), 0);
        assert_eq!(r.read_uvarint("b").unwrap(), 300);
        assert_eq!(r.read_uvarint("c").unwrap(), u64::MAX);
        assert_eq!(r.read_svarint("d").unwrap(), -1);
        assert_eq!(r.read_svarint("e").unwrap(), 1 << 40);
        assert_eq!(r.pos(), out.len());
    }

    #[test]
    fn truncated_reads_report_offset() {
        let mut r = Reader::new(&[0xAA, 0xBB]);
        r.read_u8("first").unwrap();
        let err = r.read_u32_be("length").unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompleteItem {
                item: "length",
                offset: 1,
                expected: 4,
                found: 1,
            }
        );
    }

    #[test]
    fn object_id_round_trip() {
        let id = ObjectId::from_content(b"abc");
        let mut out = Vec::new();
        out.push_object_id(&id);
        let mut r = Reader::new(&out);
        assert_eq!(r.read_object_id("id").unwrap(), id);
    }
}
