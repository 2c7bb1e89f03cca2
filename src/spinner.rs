//! Spinning: wrapping a flat strip back around a disk to make the cover
//! art. This is the inverse of [unspin](crate::unspinner::unspin) and reads
//! the same [PolarMapping].

use crate::component::Component;
use crate::config::PressConfig;
use crate::error::PressResult;
use crate::polar_mapping::{PolarGeometry, PolarMapping};
use crate::raster::{Edge, RasterImage};
use log::debug;
use std::fmt;

/// Channel value of every pixel outside the disk: transparent black.
pub const BACKGROUND: u8 = 0;

/// Projects `strip` onto a `config.disk_size` square disk with bilinear
/// interpolation. Strips that are not `angle_count` x `radius_count` are
/// resized to that shape first, so any input yields a disk; odd aspect
/// ratios only stretch the picture. The disk keeps the strip's channels.
pub fn spin(strip: &RasterImage, config: &PressConfig) -> RasterImage {
    let disk_size = config.disk_size.max(1);
    let angle_count = config.angle_count.max(1);
    let radius_count = config.radius_count.max(1);

    let fitted;
    let strip = if strip.width() == angle_count && strip.height() == radius_count {
        strip
    } else {
        debug!(
            "resizing {}x{} strip to {}x{} before spinning",
            strip.width(),
            strip.height(),
            angle_count,
            radius_count
        );
        fitted = strip.resized(angle_count, radius_count);
        &fitted
    };

    let mapping = PolarMapping::cached(PolarGeometry {
        disk_size,
        angle_count,
        radius_count,
    });

    RasterImage::from_fn_like(disk_size, disk_size, strip, |x, y, px| {
        match mapping.strip_position(x, y) {
            // the angle axis is a loop, the radius axis is not
            Some((u, v)) => strip.sample_bilinear(u, v, Edge::Wrap, px),
            None => px.fill(BACKGROUND),
        }
    })
}

/// Pipeline stage wrapping [spin].
pub struct Spinner {
    config: PressConfig,
}

impl Spinner {
    /// Instantiates a Spinner that produces disks shaped by `config`
    pub fn new(config: PressConfig) -> Self {
        Self { config }
    }
}

impl Component for Spinner {
    type InData = PressResult<RasterImage>;
    type OutData = PressResult<RasterImage>;

    fn convert(&mut self, input: PressResult<RasterImage>) -> PressResult<RasterImage> {
        input.map(|strip| spin(&strip, &self.config))
    }
}

impl fmt::Display for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spinner")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unspinner::unspin;

    fn config(disk_size: u32) -> PressConfig {
        PressConfig {
            disk_size,
            angle_count: 512,
            radius_count: disk_size / 2,
            ..Default::default()
        }
    }

    #[test]
    fn output_size_ignores_input_shape() {
        let config = config(64);
        for &(w, h) in &[(512u32, 32u32), (3, 200), (1, 1), (1000, 7)] {
            let strip = RasterImage::filled(w, h, &[90, 255]).unwrap();
            let disk = spin(&strip, &config);
            assert_eq!((disk.width(), disk.height()), (64, 64));
            assert_eq!(disk.channels(), 2);
            assert_eq!(disk.get(32, 32), Some(&[90u8, 255][..]));
            assert_eq!(disk.get(0, 0), Some(&[BACKGROUND, BACKGROUND][..]));
        }
    }

    #[test]
    fn rows_become_rings() {
        let config = config(64);
        // bright rows 20..24 of 32, i.e. radii 20 to 24 pixels
        let strip = RasterImage::from_fn(512, 32, 1, |_, v, px| {
            px[0] = if (20..24).contains(&v) { 255 } else { 0 };
        })
        .unwrap();
        let disk = spin(&strip, &config);
        // centre is 31.5, so pixel 53 sits 21.5 out along +x
        assert_eq!(disk.get(53, 31), Some(&[255u8][..]));
        assert_eq!(disk.get(31, 10), Some(&[255u8][..]));
        assert_eq!(disk.get(40, 31), Some(&[0u8][..]));
    }

    #[test]
    fn spin_unspin_round_trip() {
        let size = 128;
        let config = config(size);
        let gradient = RasterImage::from_fn(size, size, 1, |x, y, px| {
            px[0] = (x + y) as u8;
        })
        .unwrap();

        let disk = spin(&unspin(&gradient, &config).unwrap(), &config);

        let centre = (size as f32 - 1.0) / 2.0;
        let radius = size as f32 / 2.0;
        let mut error = 0.0;
        let mut inside = 0;
        for y in 0..size {
            for x in 0..size {
                let r = (x as f32 - centre).hypot(y as f32 - centre);
                let got = disk.get(x, y).unwrap()[0];
                if r > radius {
                    assert_eq!(got, BACKGROUND);
                    continue;
                }
                let want = gradient.get(x, y).unwrap()[0];
                error += (got as f32 - want as f32).abs();
                inside += 1;
            }
        }
        let mean_error = error / inside as f32;
        assert!(mean_error < 2.0, "mean absolute error {}", mean_error);
    }

    #[test]
    fn unspin_spin_round_trip_on_a_strip() {
        let config = PressConfig::default();
        let (angles, radii) = (config.angle_count, config.radius_count);
        // brighter outwards, with three smooth bumps around the circle
        let strip = RasterImage::from_fn(angles, radii, 1, |u, v, px| {
            let phase = 2.0 * std::f32::consts::PI * 3.0 * u as f32 / angles as f32;
            px[0] = (v as f32 / 2.0 + 60.0 + 60.0 * phase.sin()).round() as u8;
        })
        .unwrap();

        let back = unspin(&spin(&strip, &config), &config).unwrap();
        assert_eq!((back.width(), back.height()), (angles, radii));

        // near the centre many columns share a handful of disk pixels
        let mut error = 0.0;
        let mut count = 0;
        for v in radii / 4..radii {
            for u in 0..angles {
                let got = back.get(u, v).unwrap()[0] as f32;
                let want = strip.get(u, v).unwrap()[0] as f32;
                error += (got - want).abs();
                count += 1;
            }
        }
        let mean_error = error / count as f32;
        assert!(mean_error < 1.0, "mean absolute error {}", mean_error);
    }

    #[test]
    fn spin_is_deterministic() {
        let config = config(48);
        let strip = RasterImage::from_fn(300, 40, 3, |u, v, px| {
            px.copy_from_slice(&[u as u8, (v * 6) as u8, (u + v) as u8]);
        })
        .unwrap();
        assert_eq!(spin(&strip, &config), spin(&strip, &config));
    }
}
