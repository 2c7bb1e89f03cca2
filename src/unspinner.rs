//! Unspinning: reading a disk ring by ring into a flat strip, one column
//! per angle and one row per radius.

use crate::component::Component;
use crate::config::PressConfig;
use crate::error::{PressError, PressResult};
use crate::polar_mapping::{PolarGeometry, PolarMapping};
use crate::raster::{Edge, RasterImage};
use log::debug;
use std::fmt;

/// Resamples the square `disk` into a strip `config.angle_count` wide and
/// `config.radius_count` tall, with bilinear interpolation. The strip keeps
/// the disk's channel layout.
///
/// Fails with [PressError::InvalidGeometry] if the disk is not square.
pub fn unspin(disk: &RasterImage, config: &PressConfig) -> PressResult<RasterImage> {
    if disk.width() != disk.height() {
        return Err(PressError::InvalidGeometry(format!(
            "disk must be square, got {}x{}",
            disk.width(),
            disk.height()
        )));
    }

    let mapping = PolarMapping::cached(PolarGeometry {
        disk_size: disk.width(),
        angle_count: config.angle_count,
        radius_count: config.radius_count,
    });
    debug!(
        "unspinning {0}x{0} disk into {1}x{2} strip",
        disk.width(),
        config.angle_count,
        config.radius_count
    );

    // rows stop just inside the rim, so every sample is on the disk
    RasterImage::from_fn(
        config.angle_count,
        config.radius_count,
        disk.channels(),
        |u, v, px| {
            let (x, y) = mapping.disk_position(u, v);
            disk.sample_bilinear(x, y, Edge::Clamp, px);
        },
    )
}

/// Pipeline stage wrapping [unspin].
pub struct Unspinner {
    config: PressConfig,
}

impl Unspinner {
    /// Instantiates an Unspinner producing strips shaped by `config`
    pub fn new(config: PressConfig) -> Self {
        Self { config }
    }
}

impl Component for Unspinner {
    type InData = PressResult<RasterImage>;
    type OutData = PressResult<RasterImage>;

    fn convert(&mut self, input: PressResult<RasterImage>) -> PressResult<RasterImage> {
        input.and_then(|disk| unspin(&disk, &self.config))
    }
}

impl fmt::Display for Unspinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unspinner")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_disk::DummyDisk;

    fn small_config() -> PressConfig {
        PressConfig {
            disk_size: 64,
            angle_count: 128,
            radius_count: 32,
            ..Default::default()
        }
    }

    #[test]
    fn non_square_disk_is_rejected() {
        let disk = RasterImage::filled(10, 12, &[0]).unwrap();
        assert!(matches!(
            unspin(&disk, &small_config()),
            Err(PressError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn single_pixel_disk_unspins_flat() {
        let disk = RasterImage::filled(1, 1, &[10, 20, 30, 40]).unwrap();
        let strip = unspin(&disk, &small_config()).unwrap();
        assert_eq!((strip.width(), strip.height()), (128, 32));
        assert!(strip.pixels().all(|px| px == [10, 20, 30, 40]));
    }

    #[test]
    fn ring_becomes_a_row_band() {
        let disk = DummyDisk::builder().size(64).ring(16.0, 2.0).build().unwrap();
        let strip = unspin(&disk, &small_config()).unwrap();

        // 32 rows over a radius of 32 pixels: row v is radius v
        let row_mean = |v: u32| -> f32 {
            (0..strip.width())
                .map(|u| strip.get(u, v).unwrap()[0] as f32)
                .sum::<f32>()
                / strip.width() as f32
        };
        assert!(row_mean(16) > 200.0);
        assert!(row_mean(4) < 1.0);
        assert!(row_mean(28) < 1.0);
    }

    #[test]
    fn unspin_is_deterministic() {
        let disk = DummyDisk::builder()
            .size(48)
            .ring(10.0, 3.0)
            .noise(20.0)
            .seed(7)
            .build()
            .unwrap();
        let a = unspin(&disk, &small_config()).unwrap();
        let b = unspin(&disk, &small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn component_passes_errors_through() {
        let mut unspinner = Unspinner::new(small_config());
        let out = unspinner.convert(Err(PressError::Cancelled));
        assert!(matches!(out, Err(PressError::Cancelled)));
    }
}
