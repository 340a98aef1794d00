//! Owned 16-bit depth frame in row-major layout (stride == width).
//!
//! This is the raw sensor output: each pixel is a gray level that maps to
//! millimetres through [`DepthConversionConfig`](crate::params::DepthConversionConfig),
//! with one reserved sentinel value marking unmeasured pixels.
use super::traits::{ImageView, ImageViewMut};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepthImage {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Backing storage in row-major order
    pub data: Vec<u16>,
}

impl DepthImage {
    /// Wrap an existing buffer. Returns `None` when `data.len() != w * h`.
    pub fn from_raw(w: usize, h: usize, data: Vec<u16>) -> Option<Self> {
        (data.len() == w * h).then_some(Self { w, h, data })
    }

    /// Frame filled with a constant gray level.
    pub fn filled(w: usize, h: usize, value: u16) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u16) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Copy out the half-open rectangle `[x0, x1) × [y0, y1)`.
    pub fn crop(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> DepthImage {
        let x1 = x1.min(self.w).max(x0.min(self.w));
        let y1 = y1.min(self.h).max(y0.min(self.h));
        let x0 = x0.min(x1);
        let y0 = y0.min(y1);
        let (cw, ch) = (x1 - x0, y1 - y0);
        let mut data = Vec::with_capacity(cw * ch);
        for y in y0..y1 {
            data.extend_from_slice(&self.row(y)[x0..x1]);
        }
        DepthImage {
            w: cw,
            h: ch,
            data,
        }
    }
}

impl ImageView for DepthImage {
    type Pixel = u16;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[u16] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

impl ImageViewMut for DepthImage {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u16] {
        let start = y * self.w;
        &mut self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_copies_requested_rectangle() {
        let data: Vec<u16> = (0..20).collect();
        let img = DepthImage::from_raw(5, 4, data).unwrap();
        let sub = img.crop(1, 1, 3, 3);
        assert_eq!((sub.w, sub.h), (2, 2));
        assert_eq!(sub.data, vec![6, 7, 11, 12]);
    }

    #[test]
    fn crop_outside_frame_is_empty() {
        let img = DepthImage::filled(4, 4, 1);
        let sub = img.crop(10, 0, 12, 4);
        assert!(sub.is_empty());
        assert!(sub.data.is_empty());
    }

    #[test]
    fn from_raw_rejects_size_mismatch() {
        assert!(DepthImage::from_raw(3, 3, vec![0; 8]).is_none());
    }
}
