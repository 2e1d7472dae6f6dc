// Copyright (C) 2026, Canopy Authors. All rights reserved.
// See the file LICENSE.md for licensing terms.

/// An axis-aligned bounding box over 2D coordinates.
///
/// Absence of bounds is expressed as `Option<Bounds>` everywhere in the
/// in-memory model; NaN and flag-byte sentinels exist only in the wire
/// format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum x ordinate.
    pub min_x: f64,
    /// Maximum x ordinate.
    pub max_x: f64,
    /// Minimum y ordinate.
    pub min_y: f64,
    /// Maximum y ordinate.
    pub max_y: f64,
}

impl Bounds {
    /// Creates a box from its extremes. Min/max per axis are normalized, so
    /// argument order per axis does not matter.
    #[must_use]
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64) -> Self {
        Bounds {
            min_x: x1.min(x2),
            max_x: x1.max(x2),
            min_y: y1.min(y2),
            max_y: y1.max(y2),
        }
    }

    /// Creates a degenerate box covering a single point.
    #[must_use]
    pub const fn point(x: f64, y: f64) -> Self {
        Bounds {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    /// True if this box has zero width and zero height.
    ///
    /// Point boxes are the common case for point feature layers and get a
    /// compact single-coordinate wire representation.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.width() == 0.0 && self.height() == 0.0
    }

    /// The extent along x.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// The extent along y.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows this box to also cover `other`.
    pub fn expand_to_include(&mut self, other: &Bounds) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Union of two optional boxes; `None` is the identity.
    #[must_use]
    pub fn union(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
        match (a, b) {
            (Some(mut a), Some(b)) => {
                a.expand_to_include(&b);
                Some(a)
            }
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_extremes() {
        let b = Bounds::new(3.0, -1.0, 7.0, 2.0);
        assert_eq!(b, Bounds::new(-1.0, 3.0, 2.0, 7.0));
        assert_eq!(b.width(), 4.0);
        assert_eq!(b.height(), 5.0);
    }

    #[test]
    fn point_detection() {
        assert!(Bounds::point(1.5, -2.5).is_point());
        assert!(!Bounds::new(0.0, 1.0, 0.0, 0.0).is_point());
    }

    #[test]
    fn union_treats_none_as_identity() {
        let a = Bounds::new(0.0, 1.0, 0.0, 1.0);
        let b = Bounds::new(2.0, 3.0, -1.0, 0.5);
        assert_eq!(Bounds::union(Some(a), None), Some(a));
        assert_eq!(Bounds::union(None, Some(b)), Some(b));
        assert_eq!(Bounds::union(None, None), None);
        assert_eq!(
            Bounds::union(Some(a), Some(b)),
            Some(Bounds::new(0.0, 3.0, -1.0, 1.0))
        );
    }
}
