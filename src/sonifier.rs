//! Sonification: playing the unspun strip like a groove. Brightness is the
//! needle's displacement, so every pixel becomes a short run of samples.

use crate::audio_buffer::AudioBuffer;
use crate::component::Component;
use crate::config::PressConfig;
use crate::error::PressResult;
use crate::raster::RasterImage;
use log::debug;
use std::fmt;

/// Brightness of one pixel in [0,255]. Colour is reduced with Rec.601
/// luma weights and alpha scales the result, so transparent pixels are
/// silent troughs.
pub fn intensity(px: &[u8]) -> f32 {
    match *px {
        [gray] => gray as f32,
        [gray, alpha] => gray as f32 * alpha as f32 / 255.0,
        [r, g, b] => luma(r, g, b),
        [r, g, b, alpha] => luma(r, g, b) * alpha as f32 / 255.0,
        _ => 0.0,
    }
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// The affine map from [0,255] onto [-1,1].
pub fn amplitude(intensity: f32) -> f32 {
    intensity / 127.5 - 1.0
}

/// Scans `image` row by row and holds each pixel's amplitude for
/// `config.samples_per_pixel` samples. The result is always exactly
/// `width * height * samples_per_pixel` long.
pub fn sonify(image: &RasterImage, config: &PressConfig) -> AudioBuffer {
    let per_pixel = config.samples_per_pixel as usize;
    let pixel_count = image.width() as usize * image.height() as usize;
    let mut samples = Vec::with_capacity(pixel_count * per_pixel);

    for px in image.pixels() {
        let sample = amplitude(intensity(px));
        samples.extend(std::iter::repeat(sample).take(per_pixel));
    }

    let audio = AudioBuffer::new(config.sample_rate, samples);
    debug!(
        "sonified {}x{} strip into {} samples ({:.2} s)",
        image.width(),
        image.height(),
        audio.len(),
        audio.duration_secs()
    );
    audio
}

/// Pipeline stage wrapping [sonify].
pub struct Sonifier {
    config: PressConfig,
}

impl Sonifier {
    /// Instantiates a Sonifier using the rate and pixel length in `config`
    pub fn new(config: PressConfig) -> Self {
        Self { config }
    }
}

impl Component for Sonifier {
    type InData = PressResult<RasterImage>;
    type OutData = PressResult<AudioBuffer>;

    fn convert(&mut self, input: PressResult<RasterImage>) -> PressResult<AudioBuffer> {
        input.map(|strip| sonify(&strip, &self.config))
    }
}

impl fmt::Display for Sonifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sonifier")
    }
}
