// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug, Display};

use sha2::{Digest, Sha256};

/// A content id: the fixed-width hash that identifies every versioned object.
///
/// Equality is byte equality. An `ObjectId` is the sole reference mechanism
/// between trees; a child is referenced purely by its id, which is what makes
/// structural sharing across versions possible.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId([u8; Self::NUM_BYTES]);

impl ObjectId {
    /// The number of bytes in an [`ObjectId`].
    pub const NUM_BYTES: usize = 20;

    /// The all-zeros id, used as a sentinel for "no object" (e.g. the empty
    /// tree before it is first hashed). Never stored inside a tree buffer.
    pub const NULL: ObjectId = ObjectId([0u8; Self::NUM_BYTES]);

    /// Computes the id of an object from its canonical encoded form.
    ///
    /// The identity of every tree *is* this hash of its own canonical
    /// encoding; the hash function itself is an implementation detail of this
    /// constructor and nothing else in the codec depends on it.
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut bytes = [0u8; Self::NUM_BYTES];
        bytes.copy_from_slice(&digest[..Self::NUM_BYTES]);
        ObjectId(bytes)
    }

    /// Returns the raw bytes of this id.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::NUM_BYTES] {
        &self.0
    }

    /// Returns true if this is the all-zeros sentinel id.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl From<[u8; ObjectId::NUM_BYTES]> for ObjectId {
    fn from(bytes: [u8; ObjectId::NUM_BYTES]) -> Self {
        ObjectId(bytes)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Error returned when constructing an [`ObjectId`] from a slice of the
/// wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id length {0}, expected {expected}", expected = ObjectId::NUM_BYTES)]
pub struct InvalidObjectIdLength(pub usize);

impl TryFrom<&[u8]> for ObjectId {
    type Error = InvalidObjectIdLength;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::NUM_BYTES] = value
            .try_into()
            .map_err(|_| InvalidObjectIdLength(value.len()))?;
        Ok(ObjectId(bytes))
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", hex::encode(self.0))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_content_is_deterministic() {
        let a = ObjectId::from_content(b"hello world");
        let b = ObjectId::from_content(b"hello world");
        assert_eq!(a, b);
        assert_ne!(a, ObjectId::from_content(b"hello worle"));
    }

    #[test]
    fn try_from_rejects_wrong_lengths() {
        assert_eq!(
            ObjectId::try_from(&[0u8; 19][..]),
            Err(InvalidObjectIdLength(19))
        );
        assert!(ObjectId::try_from(&[0u8; 20][..]).is_ok());
    }

    #[test]
    fn display_is_forty_hex_chars() {
        let id = ObjectId::from_content(b"x");
        let hex = id.to_string();
        assert_eq!(hex.len(), 40);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn null_is_all_zeros() {
        assert!(ObjectId::NULL.is_null());
        assert_eq!(ObjectId::NULL.as_bytes(), &[0u8; 20]);
    }
}
