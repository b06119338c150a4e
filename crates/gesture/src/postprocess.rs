//! Model output decoding shared by the inference adapters

use crate::geometry::BoundingBox;

/// Turn SSD-style detections into face boxes in frame pixels.
///
/// `boxes` are normalised `[ymin, xmin, ymax, xmax]`, index-aligned with
/// `scores`. Kept boxes are grown by `margin`, clipped to the frame and
/// returned in model order.
pub fn decode_ssd(
    boxes: &[[f32; 4]],
    scores: &[f32],
    min_score: f32,
    frame_width: u32,
    frame_height: u32,
    margin: u32,
) -> Vec<BoundingBox> {
    let (fw, fh) = (frame_width as f32, frame_height as f32);
    boxes
        .iter()
        .zip(scores)
        .filter(|(_, score)| **score >= min_score)
        .map(|(&[ymin, xmin, ymax, xmax], _)| {
            BoundingBox::from_corners(xmin * fw, ymin * fh, xmax * fw, ymax * fh)
                .expand(margin as f32)
                .clamp_to(frame_width, frame_height)
        })
        .filter(|b| !b.is_degenerate())
        .collect()
}

/// Index and probability of the most likely class, if it reaches `min_confidence`
pub fn top_class(probabilities: &[f32], min_confidence: f32) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .filter(|&(_, p)| p >= min_confidence)
}
