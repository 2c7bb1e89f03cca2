//! The pixel buffer handed between stages. A [RasterImage] is built once
//! and then only read; stages that need a different picture allocate a new
//! one.

use crate::error::{PressError, PressResult};
use image::{ColorType, DynamicImage};
use std::path::Path;

/// Row-major 8-bit image with 1 to 4 interleaved channels: gray, gray and
/// alpha, RGB, or RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

/// What happens to a sample position that falls off the side of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Stick to the nearest edge pixel
    Clamp,
    /// Wrap around to the opposite side
    Wrap,
}

impl RasterImage {
    /// Wraps `data` as a `width` x `height` image, checking that the
    /// buffer is exactly the right length.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> PressResult<Self> {
        if width == 0 || height == 0 {
            return Err(PressError::InvalidGeometry(format!(
                "image must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(PressError::InvalidGeometry(format!(
                "images have 1 to 4 channels, got {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(PressError::InvalidGeometry(format!(
                "{}x{}x{} image needs {} bytes, got {}",
                width,
                height,
                channels,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// An image where every pixel is `pixel`. The channel count is the
    /// length of `pixel`.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> PressResult<Self> {
        let count = width as usize * height as usize;
        let data = pixel.iter().copied().cycle().take(count * pixel.len()).collect();
        Self::new(width, height, pixel.len() as u8, data)
    }

    /// Builds an image by asking `f` for each pixel in row-major order.
    pub fn from_fn<F>(width: u32, height: u32, channels: u8, f: F) -> PressResult<Self>
    where
        F: FnMut(u32, u32, &mut [u8]),
    {
        if channels == 0 {
            return Self::new(width, height, channels, Vec::new());
        }
        Self::new(width, height, channels, render(width, height, channels, f))
    }

    /// Like [from_fn](Self::from_fn), for callers whose channel count comes
    /// from an existing image. A zero width or height is bumped up to 1.
    pub(crate) fn from_fn_like<F>(width: u32, height: u32, like: &RasterImage, f: F) -> Self
    where
        F: FnMut(u32, u32, &mut [u8]),
    {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            channels: like.channels,
            data: render(width, height, like.channels, f),
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved channels per pixel
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// The raw row-major buffer
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image, handing back its buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// The channels of pixel (x, y), or `None` off the image.
    pub fn get(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        Some(&self.data[start..start + c])
    }

    /// Iterates over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.channels as usize)
    }

    /// Bilinear sample at a position given in pixel-index space, so that
    /// (2.0, 3.0) lands exactly on pixel (2, 3). The x axis follows
    /// `x_edge`, the y axis always clamps. Writes one value per channel
    /// into `out`.
    pub fn sample_bilinear(&self, x: f32, y: f32, x_edge: Edge, out: &mut [u8]) {
        let (x0, x1, fx) = axis_neighbours(x, self.width, x_edge);
        let (y0, y1, fy) = axis_neighbours(y, self.height, Edge::Clamp);

        let c = self.channels as usize;
        let w = self.width as usize;
        let at = |px: usize, py: usize, ch: usize| self.data[(py * w + px) * c + ch] as f32;

        for (ch, slot) in out.iter_mut().take(c).enumerate() {
            let top = at(x0, y0, ch) * (1.0 - fx) + at(x1, y0, ch) * fx;
            let bottom = at(x0, y1, ch) * (1.0 - fx) + at(x1, y1, ch) * fx;
            let value = top * (1.0 - fy) + bottom * fy;
            *slot = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Stretches the image to `width` x `height` with bilinear sampling,
    /// aligning pixel centres. Zero sizes are bumped up to 1.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let sx = self.width as f32 / width.max(1) as f32;
        let sy = self.height as f32 / height.max(1) as f32;
        Self::from_fn_like(width, height, self, |x, y, px| {
            let src_x = (x as f32 + 0.5) * sx - 0.5;
            let src_y = (y as f32 + 0.5) * sy - 0.5;
            self.sample_bilinear(src_x, src_y, Edge::Clamp, px);
        })
    }

    /// Decodes the image file at `path`, keeping gray, gray-alpha, RGB or
    /// RGBA layout and reducing deeper formats to 8 bits.
    pub fn from_path(path: impl AsRef<Path>) -> PressResult<Self> {
        let decoded = image::open(path)?;
        Self::from_dynamic(decoded)
    }

    /// Converts a decoded [DynamicImage].
    pub fn from_dynamic(img: DynamicImage) -> PressResult<Self> {
        let (width, height) = (img.width(), img.height());
        let color = img.color();
        let (channels, data) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (1, img.into_luma8().into_raw()),
            (false, true) => (2, img.into_luma_alpha8().into_raw()),
            (true, false) => (3, img.into_rgb8().into_raw()),
            (true, true) => (4, img.into_rgba8().into_raw()),
        };
        Self::new(width, height, channels, data)
    }

    /// Encodes the image to `path`; the format follows the file extension.
    pub fn to_path(&self, path: impl AsRef<Path>) -> PressResult<()> {
        let color = match self.channels {
            1 => ColorType::L8,
            2 => ColorType::La8,
            3 => ColorType::Rgb8,
            _ => ColorType::Rgba8,
        };
        image::save_buffer(path, &self.data, self.width, self.height, color)?;
        Ok(())
    }
}

fn render<F>(width: u32, height: u32, channels: u8, mut f: F) -> Vec<u8>
where
    F: FnMut(u32, u32, &mut [u8]),
{
    let mut data = vec![0; width as usize * height as usize * channels as usize];
    for (i, px) in data.chunks_exact_mut(channels as usize).enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        f(x, y, px);
    }
    data
}

/// Picks the two neighbouring indices around `pos` on an axis of `len`
/// pixels, and the weight of the second one.
fn axis_neighbours(pos: f32, len: u32, edge: Edge) -> (usize, usize, f32) {
    let last = len as i64 - 1;
    let pos = if pos.is_finite() { pos } else { 0.0 };
    let floor = pos.floor();
    let frac = pos - floor;
    let i0 = floor as i64;
    let i1 = i0 + 1;

    match edge {
        Edge::Clamp => {
            if pos <= 0.0 {
                (0, 0, 0.0)
            } else if pos >= last as f32 {
                (last as usize, last as usize, 0.0)
            } else {
                (i0 as usize, i1 as usize, frac)
            }
        }
        Edge::Wrap => {
            let n = len as i64;
            (i0.rem_euclid(n) as usize, i1.rem_euclid(n) as usize, frac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> RasterImage {
        RasterImage::from_fn(4, 2, 1, |x, y, px| px[0] = (x * 10 + y * 100) as u8).unwrap()
    }

    #[test]
    fn buffer_length_is_checked() {
        assert!(RasterImage::new(2, 2, 3, vec![0; 12]).is_ok());
        assert!(matches!(
            RasterImage::new(2, 2, 3, vec![0; 11]),
            Err(PressError::InvalidGeometry(_))
        ));
        assert!(RasterImage::new(0, 2, 1, vec![]).is_err());
        assert!(RasterImage::new(1, 1, 5, vec![0; 5]).is_err());
    }

    #[test]
    fn get_is_bounds_checked() {
        let img = ramp();
        assert_eq!(img.get(3, 1), Some(&[130u8][..]));
        assert_eq!(img.get(4, 0), None);
        assert_eq!(img.get(0, 2), None);
    }

    #[test]
    fn bilinear_hits_pixels_exactly() {
        let img = ramp();
        let mut out = [0u8];
        img.sample_bilinear(2.0, 1.0, Edge::Clamp, &mut out);
        assert_eq!(out[0], 120);
        img.sample_bilinear(1.5, 0.5, Edge::Clamp, &mut out);
        assert_eq!(out[0], 65);
    }

    #[test]
    fn clamp_and_wrap_edges() {
        let img = ramp();
        let mut out = [0u8];
        img.sample_bilinear(-3.0, -1.0, Edge::Clamp, &mut out);
        assert_eq!(out[0], 0);
        img.sample_bilinear(9.0, 5.0, Edge::Clamp, &mut out);
        assert_eq!(out[0], 130);
        // halfway between the last column (30) and the first (0)
        img.sample_bilinear(3.5, 0.0, Edge::Wrap, &mut out);
        assert_eq!(out[0], 15);
    }

    #[test]
    fn resize_keeps_flat_images_flat() {
        let img = RasterImage::filled(3, 5, &[7, 8, 9, 255]).unwrap();
        let big = img.resized(11, 2);
        assert_eq!(big.width(), 11);
        assert_eq!(big.height(), 2);
        assert!(big.pixels().all(|px| px == [7, 8, 9, 255]));
    }

    #[test]
    fn png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.png");
        let img = ramp();
        img.to_path(&path).unwrap();
        assert_eq!(img, RasterImage::from_path(&path).unwrap());
    }
}
