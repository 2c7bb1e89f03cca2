//! Handing pressed audio to something that can play it. The press itself
//! never touches a sound device; it only needs an [AudioSink].

use crate::audio_buffer::AudioBuffer;
use crate::error::{PressError, PressResult};
use crate::wav::{write_wav, WavFormat};
use log::info;
use std::path::PathBuf;

/// Anything that can consume a whole buffer of pressed audio.
pub trait AudioSink {
    /// Plays `audio`, returning once the sink is done with it.
    fn play(&mut self, audio: &AudioBuffer) -> PressResult<()>;
}

/// Plays `audio` through `sink`. Empty or non-finite buffers are refused
/// before they reach the sink.
pub fn play(audio: &AudioBuffer, sink: &mut dyn AudioSink) -> PressResult<()> {
    if audio.is_empty() {
        return Err(PressError::Playback("nothing to play".into()));
    }
    if let Some(index) = audio.first_non_finite() {
        return Err(PressError::Playback(format!(
            "sample {} is not a finite number",
            index
        )));
    }
    info!(
        "playing {} samples ({:.2} s at {} Hz)",
        audio.len(),
        audio.duration_secs(),
        audio.sample_rate()
    );
    sink.play(audio)
}

/// "Plays" by writing a WAV file, for headless machines and tests.
pub struct WavSink {
    path: PathBuf,
    format: WavFormat,
}

impl WavSink {
    /// A sink writing `format` samples to `path`
    pub fn new(path: impl Into<PathBuf>, format: WavFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

impl AudioSink for WavSink {
    fn play(&mut self, audio: &AudioBuffer) -> PressResult<()> {
        write_wav(&self.path, audio, self.format)
    }
}

#[cfg(feature = "playback")]
pub use device::DeviceSink;

#[cfg(feature = "playback")]
mod device {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::SampleFormat;
    use log::{debug, warn};
    use std::sync::mpsc;
    use std::time::Duration;

    /// Plays through the host's default output device. The mono signal is
    /// copied to every device channel and stepped to the device's rate.
    #[derive(Default)]
    pub struct DeviceSink;

    impl DeviceSink {
        /// A sink on the default output device
        pub fn new() -> Self {
            Self
        }
    }

    fn playback_error(what: &str, error: impl std::fmt::Display) -> PressError {
        PressError::Playback(format!("{}: {}", what, error))
    }

    impl AudioSink for DeviceSink {
        fn play(&mut self, audio: &AudioBuffer) -> PressResult<()> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| PressError::Playback("no audio output device found".into()))?;
            let supported = device
                .default_output_config()
                .map_err(|e| playback_error("failed to get audio config", e))?;
            if supported.sample_format() != SampleFormat::F32 {
                return Err(PressError::Playback(format!(
                    "device wants {:?} samples, only f32 output is supported",
                    supported.sample_format()
                )));
            }

            let channels = supported.channels().max(1) as usize;
            let device_rate = supported.sample_rate().0;
            debug!(
                "output: {} @ {} Hz, {} channels",
                device.name().unwrap_or_else(|_| "unknown".to_string()),
                device_rate,
                channels
            );

            let samples = audio.samples().to_vec();
            let step = audio.sample_rate() as f64 / device_rate as f64;
            let mut position = 0.0f64;
            let (done_tx, done_rx) = mpsc::channel();
            let mut done_tx = Some(done_tx);

            let stream = device
                .build_output_stream(
                    &supported.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let value = samples.get(position as usize).copied().unwrap_or(0.0);
                            frame.fill(value.clamp(-1.0, 1.0));
                            position += step;
                        }
                        if position as usize >= samples.len() {
                            if let Some(tx) = done_tx.take() {
                                let _ = tx.send(());
                            }
                        }
                    },
                    |err| warn!("audio stream error: {}", err),
                    None,
                )
                .map_err(|e| playback_error("failed to build audio stream", e))?;
            stream
                .play()
                .map_err(|e| playback_error("failed to start audio stream", e))?;

            // allow for device latency on top of the playing time
            let limit = Duration::from_secs_f32(audio.duration_secs()) + Duration::from_secs(2);
            done_rx
                .recv_timeout(limit)
                .map_err(|e| playback_error("audio device stalled", e))
        }
    }
}
