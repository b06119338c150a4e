//! Box geometry and overlap scoring

use camera_capture::PixelRegion;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from top-left and bottom-right corners
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area, or 0.0 for negative, empty or non-finite extents
    pub fn area(&self) -> f32 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// True when the box covers no pixels
    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite())
            || !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Area shared with `other`
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        if self.is_degenerate() || other.is_degenerate() {
            return 0.0;
        }
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        w.max(0.0) * h.max(0.0)
    }

    /// Grow every side by `margin` pixels
    pub fn expand(&self, margin: f32) -> BoundingBox {
        BoundingBox::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Clip to a `frame_width` x `frame_height` frame
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let (fw, fh) = (frame_width as f32, frame_height as f32);
        let x1 = self.x.clamp(0.0, fw);
        let y1 = self.y.clamp(0.0, fh);
        let x2 = self.right().clamp(0.0, fw);
        let y2 = self.bottom().clamp(0.0, fh);
        BoundingBox::from_corners(x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Whole-pixel region inside the frame, `None` if nothing remains after clipping
    pub fn to_pixel_region(&self, frame_width: u32, frame_height: u32) -> Option<PixelRegion> {
        let clipped = self.clamp_to(frame_width, frame_height);
        if clipped.is_degenerate() {
            return None;
        }
        let x = clipped.x.floor() as u32;
        let y = clipped.y.floor() as u32;
        let right = (clipped.right().ceil() as u32).min(frame_width);
        let bottom = (clipped.bottom().ceil() as u32).min(frame_height);
        let region = PixelRegion::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y));
        (!region.is_empty()).then_some(region)
    }
}

/// Intersection over union of two boxes, in [0, 1].
///
/// A degenerate (zero-area) box overlaps nothing, itself included, so the
/// score is 0.0 rather than a 0/0 division.
pub fn overlap_score(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter = a.intersection_area(b);
    if inter <= 0.0 {
        return 0.0;
    }

    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        (inter / union).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_boxes() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(overlap_score(&b, &b), 1.0);
    }

    #[test]
    fn test_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((overlap_score(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(overlap_score(&a, &b), 0.0);
    }

    #[test]
    fn test_degenerate_boxes_score_zero() {
        let point = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
        let line = BoundingBox::new(0.0, 5.0, 10.0, 0.0);
        let inverted = BoundingBox::new(10.0, 10.0, -5.0, -5.0);
        let full = BoundingBox::new(0.0, 0.0, 10.0, 10.0);

        assert_eq!(overlap_score(&point, &point), 0.0);
        assert_eq!(overlap_score(&line, &full), 0.0);
        assert_eq!(overlap_score(&inverted, &full), 0.0);
        assert_eq!(overlap_score(&full, &BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_clamp_and_pixel_region() {
        let b = BoundingBox::new(-5.0, 10.5, 20.0, 100.0);
        let clamped = b.clamp_to(64, 48);
        assert_eq!(clamped, BoundingBox::new(0.0, 10.5, 15.0, 37.5));

        let region = b.to_pixel_region(64, 48).unwrap();
        assert_eq!(region, PixelRegion::new(0, 10, 15, 38));

        let outside = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        assert!(outside.to_pixel_region(64, 48).is_none());
    }

    #[test]
    fn test_expand() {
        let b = BoundingBox::new(10.0, 10.0, 20.0, 20.0).expand(10.0);
        assert_eq!(b, BoundingBox::new(0.0, 0.0, 40.0, 40.0));
    }

    fn any_box() -> impl Strategy<Value = BoundingBox> {
        (-100.0f32..100.0, -100.0f32..100.0, 0.0f32..200.0, 0.0f32..200.0)
            .prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn overlap_is_bounded_and_symmetric(a in any_box(), b in any_box()) {
            let ab = overlap_score(&a, &b);
            let ba = overlap_score(&b, &a);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn positive_area_box_fully_overlaps_itself(
            x in -100.0f32..100.0, y in -100.0f32..100.0,
            w in 0.5f32..200.0, h in 0.5f32..200.0,
        ) {
            let b = BoundingBox::new(x, y, w, h);
            prop_assert!((overlap_score(&b, &b) - 1.0).abs() < 1e-3);
        }

        #[test]
        fn horizontally_disjoint_boxes_score_zero(a in any_box(), gap in 0.0f32..50.0, w in 0.5f32..50.0) {
            let b = BoundingBox::new(a.right() + gap, a.y, w, a.height.max(1.0));
            prop_assert_eq!(overlap_score(&a, &b), 0.0);
        }
    }
}
