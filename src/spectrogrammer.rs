//! The expensive stage: a short-time Fourier transform of the pressed
//! audio, squeezed into an image. One frame per row, so time runs down the
//! picture and frequency runs across it.
//!
//! [spectrogram] hands the work to a worker thread and returns a
//! [PendingSpectrogram] straight away; the caller can poll it, wait on it,
//! watch its progress, or cancel it. [compute_spectrogram] does the same
//! work on the calling thread.

use crate::audio_buffer::AudioBuffer;
use crate::component::Component;
use crate::config::{Palette, PressConfig};
use crate::error::{PressError, PressResult};
use crate::raster::RasterImage;
use log::{debug, info, warn};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Raw bin magnitudes, one vector per analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramFrames {
    frames: Vec<Vec<f32>>,
    bin_count: usize,
    reference: f32,
}

impl SpectrogramFrames {
    /// Magnitudes of each frame, oldest first
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Bins per frame, half the window size
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Magnitude a full-scale sinusoid reaches with this window; the
    /// compression curve measures everything against it.
    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// Compresses the magnitudes into a `bin_count` x `frame_count` image,
    /// coloured by `config.palette`.
    pub fn to_raster(&self, config: &PressConfig) -> PressResult<RasterImage> {
        let channels = match config.palette {
            Palette::Gray => 1,
            Palette::Heat => 4,
        };
        let width = self.bin_count as u32;
        let height = self.frames.len() as u32;

        RasterImage::from_fn(width, height, channels, |x, y, px| {
            let magnitude = self.frames[y as usize][x as usize];
            let level = config.compression.intensity(magnitude / self.reference);
            match config.palette {
                Palette::Gray => px[0] = level,
                Palette::Heat => px.copy_from_slice(&heat(level)),
            }
        })
    }
}

/// Black through red and yellow up to white.
fn heat(level: u8) -> [u8; 4] {
    let t = level as f32 / 255.0;
    let ramp = |offset: f32| ((3.0 * t - offset).clamp(0.0, 1.0) * 255.0).round() as u8;
    [ramp(0.0), ramp(1.0), ramp(2.0), 255]
}

/// Shared between a worker and its [PendingSpectrogram].
#[derive(Debug, Default)]
struct Progress {
    cancelled: AtomicBool,
    frames_done: AtomicUsize,
}

fn analyse(
    audio: &AudioBuffer,
    config: &PressConfig,
    progress: &Progress,
) -> PressResult<SpectrogramFrames> {
    if let Some(index) = audio.first_non_finite() {
        return Err(PressError::Computation(format!(
            "sample {} is {}",
            index,
            audio.samples()[index]
        )));
    }

    let size = config.window_size;
    let hop = config.hop_size;
    let bin_count = config.bin_count();
    let frame_count = config.frame_count(audio.len());

    let window = config.window.coefficients(size);
    let reference = window.iter().sum::<f32>() / 2.0;

    let mut planner = FftPlanner::<f32>::new();
    let fft: Arc<dyn Fft<f32>> = planner.plan_fft_forward(size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); size];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

    let samples = audio.samples();
    let mut frames = Vec::with_capacity(frame_count);

    for k in 0..frame_count {
        if progress.cancelled.load(Ordering::Relaxed) {
            return Err(PressError::Cancelled);
        }

        // windows running past the end read zeros
        let start = k * hop;
        let end = (start + size).min(samples.len());
        let segment = samples.get(start..end).unwrap_or(&[]);
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = segment.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process_with_scratch(&mut buffer, &mut scratch);
        frames.push(buffer[..bin_count].iter().map(|c| c.norm()).collect());

        progress.frames_done.store(k + 1, Ordering::Relaxed);
    }

    Ok(SpectrogramFrames {
        frames,
        bin_count,
        reference,
    })
}

/// Magnitude frames of `audio`, computed on the calling thread.
///
/// Fails with [PressError::Computation] if any sample is NaN or infinite.
pub fn spectrogram_frames(
    audio: &AudioBuffer,
    config: &PressConfig,
) -> PressResult<SpectrogramFrames> {
    config.validate()?;
    analyse(audio, config, &Progress::default())
}

/// The spectrogram image of `audio`, computed on the calling thread.
pub fn compute_spectrogram(audio: &AudioBuffer, config: &PressConfig) -> PressResult<RasterImage> {
    spectrogram_frames(audio, config)?.to_raster(config)
}

/// Starts computing the spectrogram of `audio` on a worker thread. An
/// invalid `config` gives a handle that is already resolved to its
/// [PressError::InvalidConfig].
pub fn spectrogram(audio: AudioBuffer, config: &PressConfig) -> PendingSpectrogram {
    if let Err(error) = config.validate() {
        return PendingSpectrogram::resolved(Err(error));
    }
    let config = config.clone();
    let progress = Arc::new(Progress::default());
    let worker_progress = Arc::clone(&progress);
    let total_frames = config.frame_count(audio.len());
    let (result_tx, result_rx) = channel();

    let handle = thread::spawn(move || {
        let started = Instant::now();
        let result = analyse(&audio, &config, &worker_progress)
            .and_then(|frames| frames.to_raster(&config));
        match &result {
            Ok(image) => info!(
                "generating {}x{} spectrogram took {:.2} seconds",
                image.width(),
                image.height(),
                started.elapsed().as_secs_f32()
            ),
            Err(error) => debug!("spectrogram worker stopped: {}", error),
        }
        // a dropped handle means nobody wants the result any more
        let _ = result_tx.send(result);
    });

    PendingSpectrogram {
        progress,
        result: result_rx,
        handle: Some(handle),
        total_frames,
    }
}

/// A spectrogram that is still being computed. Dropping the handle
/// cancels the work.
#[derive(Debug)]
pub struct PendingSpectrogram {
    progress: Arc<Progress>,
    result: Receiver<PressResult<RasterImage>>,
    handle: Option<JoinHandle<()>>,
    total_frames: usize,
}

impl PendingSpectrogram {
    fn resolved(result: PressResult<RasterImage>) -> Self {
        let (result_tx, result_rx) = channel();
        // the receiver is alive, so this cannot fail
        let _ = result_tx.send(result);
        Self {
            progress: Arc::new(Progress::default()),
            result: result_rx,
            handle: None,
            total_frames: 0,
        }
    }

    /// Asks the worker to stop at the next frame boundary. The handle then
    /// resolves to [PressError::Cancelled].
    pub fn cancel(&self) {
        self.progress.cancelled.store(true, Ordering::Relaxed);
    }

    /// Fraction of frames analysed so far, in [0,1].
    pub fn progress(&self) -> f32 {
        let done = self.progress.frames_done.load(Ordering::Relaxed);
        done as f32 / self.total_frames.max(1) as f32
    }

    /// Number of frames the finished spectrogram will have
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// True once the worker has stopped, whether it succeeded or not.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Takes the result if it is ready, without blocking. The result is
    /// handed out once; later calls report a pipeline error.
    pub fn try_take(&mut self) -> Option<PressResult<RasterImage>> {
        match self.result.try_recv() {
            Ok(result) => {
                self.join_worker();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PressError::Pipeline(
                "spectrogram result already taken".to_string(),
            ))),
        }
    }

    /// Blocks until the worker is done and returns its result.
    pub fn wait(mut self) -> PressResult<RasterImage> {
        let result = self.result.recv()?;
        self.join_worker();
        result
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("spectrogram worker panicked");
            }
        }
    }
}

impl Drop for PendingSpectrogram {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
        }
    }
}

/// Pipeline stage computing spectrograms. It already runs on its own
/// thread inside a line, so it works synchronously.
pub struct Spectrogrammer {
    config: PressConfig,
}

impl Spectrogrammer {
    /// Instantiates a Spectrogrammer with the window settings in `config`
    pub fn new(config: PressConfig) -> Self {
        Self { config }
    }
}

impl Component for Spectrogrammer {
    type InData = PressResult<AudioBuffer>;
    type OutData = PressResult<RasterImage>;

    fn convert(&mut self, input: PressResult<AudioBuffer>) -> PressResult<RasterImage> {
        input.and_then(|audio| compute_spectrogram(&audio, &self.config))
    }
}

impl fmt::Display for Spectrogrammer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spectrogrammer")
    }
}
