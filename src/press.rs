//! Whole-record operations built from the four stages: pressing one disk
//! with every intermediate kept, making cover art from audio, and the
//! [PressLine], which keeps several disks in flight on a chain of
//! component threads.

use crate::audio_buffer::AudioBuffer;
use crate::component::run_component;
use crate::config::PressConfig;
use crate::error::{PressError, PressResult};
use crate::raster::RasterImage;
use crate::sonifier::{sonify, Sonifier};
use crate::spectrogrammer::{compute_spectrogram, spectrogram, PendingSpectrogram, Spectrogrammer};
use crate::spinner::{spin, Spinner};
use crate::unspinner::{unspin, Unspinner};
use log::{debug, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

/// Everything one trip through the press produces.
#[derive(Debug, Clone)]
pub struct Pressing {
    /// The unspun disk
    pub strip: RasterImage,
    /// The strip played as a groove
    pub audio: AudioBuffer,
    /// Time-frequency picture of the audio
    pub spectrogram: RasterImage,
    /// The spectrogram spun back into a disk
    pub cover_art: RasterImage,
}

/// Spectrogrammer then Spinner: the disk-shaped picture of `audio`.
pub fn cover_art(audio: &AudioBuffer, config: &PressConfig) -> PressResult<RasterImage> {
    config.validate()?;
    let spectrogram = compute_spectrogram(audio, config)?;
    Ok(spin(&spectrogram, config))
}

/// Runs `disk` through every stage, waiting on the spectrogram.
pub fn press(disk: &RasterImage, config: &PressConfig) -> PressResult<Pressing> {
    press_with(disk, config, PendingSpectrogram::wait)
}

/// Like [press], but hands the pending spectrogram to `finish`, which can
/// watch its progress or cancel it before producing the image.
pub fn press_with<F>(disk: &RasterImage, config: &PressConfig, finish: F) -> PressResult<Pressing>
where
    F: FnOnce(PendingSpectrogram) -> PressResult<RasterImage>,
{
    config.validate()?;

    let started = Instant::now();
    let strip = unspin(disk, config)?;
    info!("unspinning took {:.3} seconds", started.elapsed().as_secs_f32());

    let started = Instant::now();
    let audio = sonify(&strip, config);
    info!("sonification took {:.3} seconds", started.elapsed().as_secs_f32());

    let spectrogram = finish(spectrogram(audio.clone(), config))?;

    let started = Instant::now();
    let cover_art = spin(&spectrogram, config);
    info!("spinning took {:.3} seconds", started.elapsed().as_secs_f32());

    Ok(Pressing {
        strip,
        audio,
        spectrogram,
        cover_art,
    })
}

///
/// The four stages wired up as threads joined by channels, turning disks
/// into cover art. Each stage works on one disk at a time, so up to four
/// disks are being pressed at once. Results come out in the order the
/// disks went in; a disk that fails at some stage comes out as its error
/// without holding up the others.
///
pub struct PressLine {
    input: Option<Sender<PressResult<RasterImage>>>,
    output: Receiver<PressResult<RasterImage>>,
    handles: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl PressLine {
    /// Starts the stage threads. Fails without starting anything if
    /// `config` is invalid.
    pub fn new(config: &PressConfig) -> PressResult<Self> {
        config.validate()?;

        let (disk_tx, disk_rx) = channel();
        let (strip_tx, strip_rx) = channel();
        let (audio_tx, audio_rx) = channel();
        let (spectrogram_tx, spectrogram_rx) = channel();
        let (art_tx, art_rx) = channel();

        let handles = vec![
            run_component(Unspinner::new(config.clone()), disk_rx, strip_tx),
            run_component(Sonifier::new(config.clone()), strip_rx, audio_tx),
            run_component(Spectrogrammer::new(config.clone()), audio_rx, spectrogram_tx),
            run_component(Spinner::new(config.clone()), spectrogram_rx, art_tx),
        ];
        debug!("press line started with {} stages", handles.len());

        Ok(Self {
            input: Some(disk_tx),
            output: art_rx,
            handles,
            in_flight: 0,
        })
    }

    /// Feeds a disk into the line without waiting for it.
    pub fn submit(&mut self, disk: RasterImage) -> PressResult<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| PressError::Pipeline("press line is shut down".to_string()))?;
        input.send(Ok(disk))?;
        self.in_flight += 1;
        Ok(())
    }

    /// Disks submitted but not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Blocks for the cover art of the oldest disk still in the line, or
    /// returns `None` when nothing is in flight.
    pub fn recv(&mut self) -> Option<PressResult<RasterImage>> {
        if self.in_flight == 0 {
            return None;
        }
        self.in_flight -= 1;
        Some(self.output.recv().unwrap_or_else(|e| Err(e.into())))
    }

    /// Stops taking disks, collects everything still in flight and joins
    /// the stage threads.
    pub fn shutdown(mut self) -> Vec<PressResult<RasterImage>> {
        self.input = None;
        let mut rest = Vec::with_capacity(self.in_flight);
        while let Some(result) = self.recv() {
            rest.push(result);
        }
        self.join();
        rest
    }

    fn join(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("press line stage panicked");
            }
        }
    }
}

impl Drop for PressLine {
    fn drop(&mut self) {
        // hanging up the input lets every stage run dry and exit
        self.input = None;
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_disk::DummyDisk;
    use crate::spectrogrammer::spectrogram_frames;

    fn small_config() -> PressConfig {
        PressConfig {
            disk_size: 64,
            angle_count: 128,
            radius_count: 32,
            window_size: 256,
            hop_size: 128,
            ..Default::default()
        }
    }

    #[test]
    fn a_ring_survives_the_whole_press() {
        let config = PressConfig::default();
        let disk = DummyDisk::builder().size(512).ring(200.0, 6.0).build().unwrap();
        let pressing = press(&disk, &config).unwrap();

        // unspun: row v of 256 sits v pixels from the centre
        let strip = &pressing.strip;
        assert_eq!((strip.width(), strip.height()), (1024, 256));
        let row_mean = |v: u32| -> f32 {
            (0..strip.width())
                .map(|u| strip.get(u, v).unwrap()[0] as f32)
                .sum::<f32>()
                / strip.width() as f32
        };
        assert!(row_mean(200) > 200.0);
        assert!(row_mean(100) < 1.0);

        // sonified: each row is 1024 pixels of 2 samples
        let audio = &pressing.audio;
        assert_eq!(audio.len(), 1024 * 256 * 2);
        assert!(audio.samples()[200 * 2048 + 100] > 0.9);
        assert_eq!(audio.samples()[100 * 2048 + 100], -1.0);

        // analysed: frame k starts at sample 512k, so row 200 is near frame 800
        let frames = spectrogram_frames(audio, &config).unwrap();
        assert_eq!(frames.frame_count(), config.frame_count(audio.len()));
        let image = &pressing.spectrogram;
        assert_eq!(image.width() as usize, frames.bin_count());
        assert_eq!(image.height() as usize, frames.frame_count());
        let high_bins = |frame: u32| -> f32 {
            (4..image.width())
                .map(|bin| image.get(bin, frame).unwrap()[0] as f32)
                .sum::<f32>()
                / (image.width() - 4) as f32
        };
        let loudest_near_ring = (780..=820).map(high_bins).fold(0.0, f32::max);
        let loudest_in_the_dark = (100..200).map(high_bins).fold(0.0, f32::max);
        assert!(loudest_near_ring > 40.0, "ring edge level {}", loudest_near_ring);
        assert!(loudest_in_the_dark < 5.0, "dark level {}", loudest_in_the_dark);

        let art = &pressing.cover_art;
        assert_eq!((art.width(), art.height()), (512, 512));
    }

    #[test]
    fn cover_art_matches_the_stages() {
        let config = small_config();
        let disk = DummyDisk::builder().size(64).ring(12.0, 3.0).build().unwrap();
        let pressing = press(&disk, &config).unwrap();
        assert_eq!(cover_art(&pressing.audio, &config).unwrap(), pressing.cover_art);
        assert_eq!(
            pressing.cover_art,
            spin(&compute_spectrogram(&pressing.audio, &config).unwrap(), &config)
        );
    }

    #[test]
    fn press_with_hands_over_the_pending_spectrogram() {
        let config = small_config();
        let disk = DummyDisk::builder().size(64).build().unwrap();
        // 128 x 32 pixels at 2 samples each
        let expected_frames = config.frame_count(128 * 32 * 2);
        let result = press_with(&disk, &config, |pending| {
            assert_eq!(pending.total_frames(), expected_frames);
            Err(PressError::Cancelled)
        });
        assert!(matches!(result, Err(PressError::Cancelled)));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = PressConfig {
            hop_size: 0,
            ..small_config()
        };
        let disk = DummyDisk::builder().size(64).build().unwrap();
        assert!(matches!(press(&disk, &config), Err(PressError::InvalidConfig(_))));
        let audio = AudioBuffer::silent(44100, 4096);
        assert!(matches!(
            cover_art(&audio, &config),
            Err(PressError::InvalidConfig(_))
        ));
        assert!(matches!(
            PressLine::new(&config),
            Err(PressError::InvalidConfig(_))
        ));
    }

    #[test]
    fn press_line_keeps_submission_order() {
        let config = small_config();
        let disks: Vec<_> = [6.0, 14.0, 25.0]
            .iter()
            .map(|&r| DummyDisk::builder().size(64).ring(r, 2.0).build().unwrap())
            .collect();

        let mut line = PressLine::new(&config).unwrap();
        for disk in &disks {
            line.submit(disk.clone()).unwrap();
        }
        assert_eq!(line.in_flight(), 3);

        for disk in &disks {
            let expected = press(disk, &config).unwrap().cover_art;
            assert_eq!(line.recv().unwrap().unwrap(), expected);
        }
        assert!(line.recv().is_none());
        assert!(line.shutdown().is_empty());
    }

    #[test]
    fn press_line_passes_failures_through() {
        let config = small_config();
        let good = DummyDisk::builder().size(64).ring(10.0, 2.0).build().unwrap();
        let lopsided = RasterImage::filled(64, 40, &[0]).unwrap();

        let mut line = PressLine::new(&config).unwrap();
        line.submit(good.clone()).unwrap();
        line.submit(lopsided).unwrap();
        line.submit(good).unwrap();

        let results = line.shutdown();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PressError::InvalidGeometry(_))));
        assert!(results[2].is_ok());
    }
}
