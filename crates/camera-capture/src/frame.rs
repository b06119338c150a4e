//! Video frame types and processing

use crate::CameraError;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};

/// Integer pixel rectangle inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// True when the region has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the source started)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Solid black frame, mostly useful for replays driven by annotations
    pub fn blank(width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self::new(
            vec![0; (width * height * 3) as usize],
            width,
            height,
            timestamp_ns,
            sequence,
        )
    }

    /// Decode an encoded still (PNG, JPEG, BMP) into an RGB frame
    pub fn decode(bytes: &[u8], timestamp_ns: u64, sequence: u32) -> Result<Self, CameraError> {
        let img = image::load_from_memory(bytes).map_err(|e| CameraError::Decode(e.to_string()))?;
        Ok(Self::from_rgb_image(img.to_rgb8(), timestamp_ns, sequence))
    }

    /// Wrap an `image` RGB buffer
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Borrow the pixels as an `image` buffer
    pub fn as_rgb_image(&self) -> Option<ImageBuffer<Rgb<u8>, &[u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Crop a region of the frame
    pub fn crop(&self, region: PixelRegion) -> Option<VideoFrame> {
        let PixelRegion { x, y, width: w, height: h } = region;
        if region.is_empty() || x + w > self.width || y + h > self.height {
            return None;
        }
        let img: RgbImage = ImageBuffer::from_raw(self.width, self.height, self.data.clone())?;
        let cropped = imageops::crop_imm(&img, x, y, w, h).to_image();
        Some(Self::from_rgb_image(cropped, self.timestamp_ns, self.sequence))
    }

    /// Resize with a triangle (bilinear) filter
    pub fn resize(&self, new_width: u32, new_height: u32) -> Option<VideoFrame> {
        if new_width == 0 || new_height == 0 {
            return None;
        }
        let img = self.as_rgb_image()?;
        let resized = imageops::resize(&img, new_width, new_height, FilterType::Triangle);
        Some(Self::from_rgb_image(resized, self.timestamp_ns, self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_crop_copies_rows() {
        let frame = gradient(8, 6);
        let crop = frame.crop(PixelRegion::new(2, 1, 3, 2)).unwrap();

        assert_eq!(crop.width, 3);
        assert_eq!(crop.height, 2);
        assert_eq!(crop.get_pixel(0, 0), Some([2, 1, 0]));
        assert_eq!(crop.get_pixel(2, 1), Some([4, 2, 0]));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let frame = gradient(8, 6);
        assert!(frame.crop(PixelRegion::new(6, 0, 3, 2)).is_none());
        assert!(frame.crop(PixelRegion::new(0, 0, 0, 2)).is_none());
    }

    #[test]
    fn test_resize_keeps_flat_colour_and_metadata() {
        let frame = VideoFrame::from_rgb_image(RgbImage::from_pixel(10, 6, Rgb([90, 40, 200])), 5, 3);
        let resized = frame.resize(4, 4).unwrap();

        assert_eq!((resized.width, resized.height), (4, 4));
        assert_eq!(resized.get_pixel(3, 3), Some([90, 40, 200]));
        assert_eq!((resized.timestamp_ns, resized.sequence), (5, 3));
        assert!(frame.resize(0, 4).is_none());
    }

    #[test]
    fn test_malformed_buffer_is_not_processed() {
        let frame = VideoFrame::new(vec![0; 5], 4, 4, 0, 0);
        assert!(frame.resize(2, 2).is_none());
        assert!(frame.crop(PixelRegion::new(0, 0, 2, 2)).is_none());
    }

    #[test]
    fn test_decode_png() {
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(1, 2, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let frame = VideoFrame::decode(&bytes, 42, 7).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.get_pixel(1, 2), Some([10, 20, 30]));
        assert_eq!(frame.timestamp_ns, 42);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_decode_garbage() {
        let err = VideoFrame::decode(b"not an image", 0, 0).unwrap_err();
        assert!(matches!(err, CameraError::Decode(_)));
    }

    proptest! {
        #[test]
        fn resize_produces_requested_dimensions(w in 1u32..32, h in 1u32..32, nw in 1u32..32, nh in 1u32..32) {
            let resized = gradient(w, h).resize(nw, nh).unwrap();
            prop_assert_eq!((resized.width, resized.height), (nw, nh));
            prop_assert_eq!(resized.data.len(), (nw * nh * 3) as usize);
            prop_assert!(resized.as_rgb_image().is_some());
        }
    }
}
