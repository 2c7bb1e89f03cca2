//! Every number the press depends on lives here, with its unit and its
//! default. A config can be written out and read back as [ron], e.g.
//!
//! ```text
//! (disk_size:512,angle_count:1024,radius_count:256,samples_per_pixel:2,
//!  sample_rate:44100,window_size:1024,hop_size:512,window:Hann,
//!  compression:Decibel(floor_db:-80.0),palette:Gray)
//! ```
//!
//! Fields left out of the file keep their defaults.

use crate::error::{PressError, PressResult};
use serde::{Deserialize, Serialize};
use std::{
    f32::consts::PI,
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// Tuning for all four stages of the press.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PressConfig {
    /// Side length in pixels of the disk produced by the Spinner. The disk
    /// radius is half of this.
    pub disk_size: u32,

    /// Columns of the unspun strip; one column per angular step around the
    /// disk.
    pub angle_count: u32,

    /// Rows of the unspun strip; row 0 is the disk centre, the last row
    /// sits just inside the rim.
    pub radius_count: u32,

    /// Audio samples emitted for every pixel of the strip.
    pub samples_per_pixel: u32,

    /// Sample rate of the produced audio, in Hz.
    pub sample_rate: u32,

    /// Length of each analysis window in samples. Must be even.
    pub window_size: usize,

    /// Distance between the starts of consecutive windows, in samples.
    pub hop_size: usize,

    /// Taper applied to each window before the transform.
    pub window: WindowFunction,

    /// Curve that squeezes bin magnitudes into pixel intensities.
    pub compression: Compression,

    /// Colouring of the spectrogram image.
    pub palette: Palette,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            disk_size: 512,
            angle_count: 1024,
            radius_count: 256,
            samples_per_pixel: 2,
            sample_rate: 44100,
            window_size: 1024,
            hop_size: 512,
            window: WindowFunction::Hann,
            compression: Compression::Decibel { floor_db: -80.0 },
            palette: Palette::Gray,
        }
    }
}

/// Window functions for the short-time transform. All are the periodic
/// form, so a constant signal only leaks into the neighbouring bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum WindowFunction {
    /// Raised cosine reaching zero at both ends
    Hann,
    /// Raised cosine on a 0.08 pedestal
    Hamming,
    /// No taper at all
    Rectangular,
}

impl WindowFunction {
    /// Builds the coefficient table for a window of `size` samples.
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        (0..size)
            .map(|n| {
                let phase = 2.0 * PI * n as f32 / size as f32;
                match self {
                    WindowFunction::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowFunction::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// How a bin magnitude is turned into an intensity in [0,255]. Magnitudes
/// are first divided by the magnitude a full-scale sinusoid would reach.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum Compression {
    /// Decibels above `floor_db` map linearly onto [0,255]; 0 dB is white.
    Decibel {
        /// Level that maps to intensity 0, must be negative
        floor_db: f32,
    },
    /// Square root of the relative magnitude, clipped at 1.
    Sqrt,
}

impl Compression {
    /// Maps a relative magnitude (1.0 = full scale) to an intensity.
    pub fn intensity(&self, relative: f32) -> u8 {
        let level = match *self {
            Compression::Decibel { floor_db } => {
                let db = 20.0 * relative.max(1e-10).log10();
                (db - floor_db) / -floor_db
            }
            Compression::Sqrt => relative.max(0.0).sqrt(),
        };
        (level.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Spectrogram colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Palette {
    /// One grayscale channel
    Gray,
    /// Opaque RGBA running black, red, yellow, white
    Heat,
}

impl PressConfig {
    /// Reads a config from a RON file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> PressResult<Self> {
        let mut handle = File::open(path)?;
        Self::from_file(&mut handle)
    }

    /// Reads a config from the [Read]able object provided and validates it.
    pub fn from_file(file: &mut impl Read) -> PressResult<Self> {
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        let config: PressConfig = ron::de::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes this config out as RON.
    pub fn to_file(&self, file: &mut impl Write) -> PressResult<()> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Checks that every size is usable.
    pub fn validate(&self) -> PressResult<()> {
        let bad = |why: &str| Err(PressError::InvalidConfig(why.to_string()));

        if self.disk_size == 0 {
            return bad("disk_size must be at least 1");
        }
        if self.angle_count == 0 || self.radius_count == 0 {
            return bad("angle_count and radius_count must be at least 1");
        }
        if self.samples_per_pixel == 0 {
            return bad("samples_per_pixel must be at least 1");
        }
        if self.sample_rate == 0 {
            return bad("sample_rate must be at least 1");
        }
        if self.window_size < 2 || self.window_size % 2 != 0 {
            return bad("window_size must be even and at least 2");
        }
        if self.hop_size == 0 {
            return bad("hop_size must be at least 1");
        }
        if let Compression::Decibel { floor_db } = self.compression {
            if floor_db.is_nan() || floor_db >= 0.0 {
                return bad("floor_db must be negative");
            }
        }
        Ok(())
    }

    /// Number of spectrogram frames for `sample_count` samples of audio.
    pub fn frame_count(&self, sample_count: usize) -> usize {
        if sample_count < self.window_size {
            1
        } else {
            (sample_count - self.window_size) / self.hop_size.max(1) + 1
        }
    }

    /// Number of frequency bins kept per spectrogram frame.
    pub fn bin_count(&self) -> usize {
        self.window_size / 2
    }
}
