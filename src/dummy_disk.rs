//! Synthetic disks for tests and demos, so the press can run without a
//! camera pointed at a real record.

use crate::error::{PressError, PressResult};
use crate::raster::RasterImage;
use rand::prelude::*;
use std::f32::consts::PI;

/// A grayscale test disk: black, with bright rings and optional spokes,
/// plus uniform noise.
#[derive(Debug, Clone)]
pub struct DummyDisk {
    size: u32,
    rings: Vec<(f32, f32)>,
    spokes: u32,
    brightness: u8,
    noise: f32,
    seed: u64,
}

impl Default for DummyDisk {
    fn default() -> Self {
        Self {
            size: 512,
            rings: Vec::new(),
            spokes: 0,
            brightness: 255,
            noise: 0.0,
            seed: 0,
        }
    }
}

impl DummyDisk {
    /// Starts from a blank 512 pixel disk.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Side length of the disk in pixels
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Adds a ring centred `radius` pixels out, `width` pixels across.
    pub fn ring(mut self, radius: f32, width: f32) -> Self {
        self.rings.push((radius, width));
        self
    }

    /// Adds `count` evenly spaced bright spokes, each one pixel wide.
    pub fn spokes(mut self, count: u32) -> Self {
        self.spokes = count;
        self
    }

    /// Intensity of rings and spokes
    pub fn brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    /// Adds uniform noise in `-noise..noise` to every pixel.
    pub fn noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    /// Seed for the noise generator, so the same builder draws the same disk
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Draws the disk as a one-channel image. Fails if the size is zero or
    /// the noise is not a finite number.
    pub fn build(self) -> PressResult<RasterImage> {
        if !self.noise.is_finite() {
            return Err(PressError::InvalidConfig(format!(
                "noise must be finite, got {}",
                self.noise
            )));
        }
        let size = self.size;
        let disk_radius = size as f32 / 2.0;
        let centre = (size as f32 - 1.0) / 2.0;
        let mut rng = StdRng::seed_from_u64(self.seed);

        RasterImage::from_fn(size, size, 1, |x, y, px| {
            let dx = x as f32 - centre;
            let dy = y as f32 - centre;
            let r = dx.hypot(dy);

            let on_ring = self
                .rings
                .iter()
                .any(|&(radius, width)| (r - radius).abs() <= width / 2.0);
            let on_spoke = self.spokes > 0 && r <= disk_radius && {
                let step = 2.0 * PI / self.spokes as f32;
                let theta = dy.atan2(dx).rem_euclid(step);
                // arc length to the nearest spoke
                theta.min(step - theta) * r <= 0.5
            };

            let mut value = if on_ring || on_spoke {
                self.brightness as f32
            } else {
                0.0
            };
            if self.noise > 0.0 {
                value += rng.gen_range(-self.noise..self.noise);
            }
            px[0] = value.round().clamp(0.0, 255.0) as u8;
        })
    }
}
