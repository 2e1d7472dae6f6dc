// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Typed values carried in a node's extra-data map.
//!
//! The codec treats these as opaque attribute values: a stable one-byte tag
//! followed by a tag-specific payload. Scalars use varint/zigzag encodings,
//! floats use fixed big-endian bit patterns, and byte-ish payloads are
//! length-prefixed so a reader can skip a value without decoding it (which
//! is what makes single-key extra-data lookups cheap).

use crate::codec::reader::{Reader, WriteBytes};
use crate::error::DecodeError;

const TAG_BOOL: u8 = 0x01;
const TAG_SHORT: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_LONG: u8 = 0x04;
const TAG_FLOAT: u8 = 0x05;
const TAG_DOUBLE: u8 = 0x06;
const TAG_STRING: u8 = 0x07;
const TAG_BYTES: u8 = 0x08;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// A 16-bit integer.
    Short(i16),
    /// A 32-bit integer.
    Int(i32),
    /// A 64-bit integer.
    Long(i64),
    /// A single-precision float.
    Float(f32),
    /// A double-precision float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// An opaque byte payload.
    Bytes(Vec<u8>),
}

impl Value {
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Value::Bool(v) => {
                out.push(TAG_BOOL);
                out.push(u8::from(*v));
            }
            Value::Short(v) => {
                out.push(TAG_SHORT);
                out.push_svarint(i64::from(*v));
            }
            Value::Int(v) => {
                out.push(TAG_INT);
                out.push_svarint(i64::from(*v));
            }
            Value::Long(v) => {
                out.push(TAG_LONG);
                out.push_svarint(*v);
            }
            Value::Float(v) => {
                out.push(TAG_FLOAT);
                out.push_f32_be(*v);
            }
            Value::Double(v) => {
                out.push(TAG_DOUBLE);
                out.push_f64_be(*v);
            }
            Value::String(v) => {
                out.push(TAG_STRING);
                out.push_uvarint(v.len() as u64);
                out.extend_from_slice(v.as_bytes());
            }
            Value::Bytes(v) => {
                out.push(TAG_BYTES);
                out.push_uvarint(v.len() as u64);
                out.extend_from_slice(v);
            }
        }
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Value, DecodeError> {
        let tag_offset = reader.pos();
        let tag = reader.read_u8("value tag")?;
        let value = match tag {
            TAG_BOOL => {
                let offset = reader.pos();
                match reader.read_u8("bool value")? {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    found => {
                        return Err(DecodeError::InvalidItem {
                            item: "bool value",
                            offset,
                            expected: "0 or 1",
                            found: found.to_string(),
                        });
                    }
                }
            }
            TAG_SHORT => {
                let offset = reader.pos();
                let raw = reader.read_svarint("short value")?;
                Value::Short(i16::try_from(raw).map_err(|_| DecodeError::InvalidItem {
                    item: "short value",
                    offset,
                    expected: "a value that fits in 16 bits",
                    found: raw.to_string(),
                })?)
            }
            TAG_INT => Value::Int(reader.read_svarint32("int value")?),
            TAG_LONG => Value::Long(reader.read_svarint("long value")?),
            TAG_FLOAT => Value::Float(reader.read_f32_be("float value")?),
            TAG_DOUBLE => Value::Double(reader.read_f64_be("double value")?),
            TAG_STRING => {
                let len = reader.read_uvarint_len("string value length")?;
                let offset = reader.pos();
                let bytes = reader.read_bytes(len, "string value")?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { offset })?;
                Value::String(text.to_string())
            }
            TAG_BYTES => {
                let len = reader.read_uvarint_len("bytes value length")?;
                Value::Bytes(reader.read_bytes(len, "bytes value")?.to_vec())
            }
            found => {
                return Err(DecodeError::InvalidItem {
                    item: "value tag",
                    offset: tag_offset,
                    expected: "a known value tag (0x01..=0x08)",
                    found: format!("{found:#04x}"),
                });
            }
        };
        Ok(value)
    }

    /// Advances `reader` past one encoded value without materializing it.
    pub(crate) fn skip(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        let tag_offset = reader.pos();
        let tag = reader.read_u8("value tag")?;
        match tag {
            TAG_BOOL => {
                reader.read_u8("bool value")?;
            }
            TAG_SHORT | TAG_INT | TAG_LONG => {
                reader.read_svarint("integer value")?;
            }
            TAG_FLOAT => {
                reader.read_f32_be("float value")?;
            }
            TAG_DOUBLE => {
                reader.read_f64_be("double value")?;
            }
            TAG_STRING | TAG_BYTES => {
                let len = reader.read_uvarint_len("value length")?;
                reader.read_bytes(len, "value payload")?;
            }
            found => {
                return Err(DecodeError::InvalidItem {
                    item: "value tag",
                    offset: tag_offset,
                    expected: "a known value tag (0x01..=0x08)",
                    found: format!("{found:#04x}"),
                });
            }
        }
        Ok(())
    }
}
