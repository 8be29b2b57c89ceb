//! Axis-aligned box primitives used by duplicate collapsing.
//!
//! Everything here is a pure function over [`BoundingBox`]; the detector
//! is trusted to emit x1 < x2 and y1 < y2, and nothing re-validates that.

use serde::{Deserialize, Serialize};

/// Face bounding box in image coordinates (y-down, x-right).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box area. Degenerate boxes yield 0.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).abs() * (self.y2 - self.y1).abs()
    }
}

/// Area of the axis-aligned intersection of two boxes, 0 when disjoint.
///
/// When the boxes overlap on both axes, the four endpoints of each axis
/// are sorted and the two middle gaps multiplied; a degenerate box gives
/// a zero-length middle gap and therefore area 0.
pub fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.x2 < b.x1 || b.x2 < a.x1 || a.y2 < b.y1 || b.y2 < a.y1 {
        return 0.0;
    }

    let mut xs = [a.x1, a.x2, b.x1, b.x2];
    let mut ys = [a.y1, a.y2, b.y1, b.y2];
    xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
    ys.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));

    (xs[2] - xs[1]) * (ys[2] - ys[1])
}

/// Coarse same-face test: true when the x1, y1 and x2 corners of the two
/// boxes have each shifted by less than `max_shift` pixels.
pub fn corners_within(a: &BoundingBox, b: &BoundingBox, max_shift: f32) -> bool {
    (a.x1 - b.x1).abs() < max_shift
        && (a.y1 - b.y1).abs() < max_shift
        && (a.x2 - b.x2).abs() < max_shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_disjoint_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(200.0, 200.0, 300.0, 300.0);
        assert_eq!(overlap_area(&a, &b), 0.0);
        assert_eq!(overlap_area(&b, &a), 0.0);

        // Disjoint on one axis only
        let c = BoundingBox::new(0.0, 200.0, 100.0, 300.0);
        assert_eq!(overlap_area(&a, &c), 0.0);
    }

    #[test]
    fn test_overlap_self_is_area() {
        let b = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert!((overlap_area(&b, &b) - b.area()).abs() < 1e-3);
    }

    #[test]
    fn test_overlap_contained_is_inner_area() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let inner = BoundingBox::new(10.0, 10.0, 90.0, 90.0);
        let expected = inner.area();
        assert!((overlap_area(&outer, &inner) - expected).abs() < 1e-3);
        assert!((overlap_area(&inner, &outer) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_overlap_partial() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert!((overlap_area(&a, &b) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_overlap_degenerate_is_zero() {
        let a = BoundingBox::new(5.0, 0.0, 5.0, 10.0);
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overlap_area(&a, &b), 0.0);
    }

    #[test]
    fn test_corners_within() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(3.0, 2.0, 101.0, 140.0);
        assert!(corners_within(&a, &b, 5.0));

        let c = BoundingBox::new(20.0, 0.0, 100.0, 100.0);
        assert!(!corners_within(&a, &c, 5.0));
    }
}
