// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! Packed coordinate sequences for node bounds.
//!
//! All bounding boxes of one node set are packed into a single sequence of
//! float-precision coordinates: per axis, the f32 bit patterns are
//! delta-encoded against the previous value and written as zigzag varints.
//! Nearby geometries produce nearby bit patterns, so deltas stay small and
//! the section compresses well even before any outer compression.
//!
//! Precision is deliberately f32, not f64: bounds only gate spatial
//! filtering, they never stand in for the true geometry.

use crate::codec::reader::{Reader, WriteBytes};
use crate::error::DecodeError;

/// Appends the packed form of `coords` (x array, then y array).
pub(crate) fn encode(coords: &[(f64, f64)], out: &mut Vec<u8>) {
    encode_axis(coords.iter().map(|&(x, _)| x), coords.len(), out);
    encode_axis(coords.iter().map(|&(_, y)| y), coords.len(), out);
}

fn encode_axis(ordinates: impl Iterator<Item = f64>, len: usize, out: &mut Vec<u8>) {
    out.push_uvarint(len as u64);
    let mut prev: i32 = 0;
    for ordinate in ordinates {
        let bits = (ordinate as f32).to_bits() as i32;
        out.push_svarint(i64::from(bits.wrapping_sub(prev)));
        prev = bits;
    }
}

/// A decoded coordinate sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CoordSeq {
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl CoordSeq {
    /// Parses a packed sequence starting at `offset`.
    pub(crate) fn parse(data: &[u8], offset: usize) -> Result<CoordSeq, DecodeError> {
        let mut reader = Reader::at(data, offset);
        let xs = parse_axis(&mut reader)?;
        let ys = parse_axis(&mut reader)?;
        if xs.len() != ys.len() {
            return Err(DecodeError::InvalidItem {
                item: "coordinate sequence",
                offset,
                expected: "equal x and y ordinate counts",
                found: format!("{} x, {} y", xs.len(), ys.len()),
            });
        }
        Ok(CoordSeq { xs, ys })
    }

    pub(crate) fn len(&self) -> usize {
        self.xs.len()
    }

    /// The coordinate at `index`, widened back to f64.
    pub(crate) fn get(&self, index: usize) -> Option<(f64, f64)> {
        let x = *self.xs.get(index)?;
        let y = *self.ys.get(index)?;
        Some((f64::from(x), f64::from(y)))
    }
}

fn parse_axis(reader: &mut Reader<'_>) -> Result<Vec<f32>, DecodeError> {
    let count = reader.read_uvarint_len("ordinate count")?;
    let mut ordinates = Vec::with_capacity(count.min(1 << 20));
    let mut prev: i32 = 0;
    for _ in 0..count {
        let delta = reader.read_svarint32("ordinate delta")?;
        prev = prev.wrapping_add(delta);
        ordinates.push(f32::from_bits(prev as u32));
    }
    Ok(ordinates)
}
