//! WAV export and import through hound. Pressed audio is mono; reading a
//! multi-channel file mixes it down so anything can be played or analysed.

use crate::audio_buffer::AudioBuffer;
use crate::error::PressResult;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// Sample encoding of written WAV data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WavFormat {
    /// 32-bit IEEE float, lossless for our samples
    #[default]
    Float32,
    /// 16-bit signed PCM, samples clipped to [-1,1]
    Int16,
}

impl WavFormat {
    fn spec(self, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavFormat::Float32 => (32, SampleFormat::Float),
            WavFormat::Int16 => (16, SampleFormat::Int),
        };
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

fn write_samples<W: Write + Seek>(
    writer: W,
    audio: &AudioBuffer,
    format: WavFormat,
) -> PressResult<()> {
    let mut writer = WavWriter::new(writer, format.spec(audio.sample_rate()))?;
    match format {
        WavFormat::Float32 => {
            for &sample in audio.samples() {
                writer.write_sample(sample)?;
            }
        }
        WavFormat::Int16 => {
            for &sample in audio.samples() {
                writer.write_sample(to_i16(sample))?;
            }
        }
    }
    // finalize rewrites the header lengths; dropping would swallow errors
    writer.finalize()?;
    Ok(())
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Encodes `audio` as a complete in-memory WAV file.
pub fn encode_wav(audio: &AudioBuffer, format: WavFormat) -> PressResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_samples(&mut cursor, audio, format)?;
    Ok(cursor.into_inner())
}

/// Writes `audio` to a WAV file at `path`.
pub fn write_wav(
    path: impl AsRef<Path>,
    audio: &AudioBuffer,
    format: WavFormat,
) -> PressResult<()> {
    let path = path.as_ref();
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_samples(file, audio, format)?;
    debug!(
        "wrote {} samples as {:?} to {}",
        audio.len(),
        format,
        path.display()
    );
    Ok(())
}

/// Decodes WAV data from any reader. Integer samples are scaled into
/// [-1,1] and channels are averaged into one.
pub fn decode_wav<R: Read>(reader: R) -> PressResult<AudioBuffer> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();

    let interleaved = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioBuffer::new(spec.sample_rate, samples))
}

/// Reads the WAV file at `path`, see [decode_wav].
pub fn read_wav(path: impl AsRef<Path>) -> PressResult<AudioBuffer> {
    let file = std::io::BufReader::new(std::fs::File::open(path)?);
    decode_wav(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> AudioBuffer {
        let samples = (0..200).map(|i| i as f32 / 100.0 - 1.0).collect();
        AudioBuffer::new(44100, samples)
    }

    #[test]
    fn float_wav_is_lossless() {
        let audio = ramp();
        let bytes = encode_wav(&audio, WavFormat::Float32).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(decode_wav(Cursor::new(bytes)).unwrap(), audio);
    }

    #[test]
    fn int16_wav_is_close() {
        let audio = ramp();
        let bytes = encode_wav(&audio, WavFormat::Int16).unwrap();
        let float_bytes = encode_wav(&audio, WavFormat::Float32).unwrap();
        assert!(bytes.len() + audio.len() < float_bytes.len());

        let back = decode_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(back.sample_rate(), 44100);
        for (a, b) in audio.samples().iter().zip(back.samples()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn int16_clips_out_of_range_samples() {
        assert_eq!(to_i16(3.0), i16::MAX);
        assert_eq!(to_i16(-3.0), -i16::MAX);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn stereo_files_are_mixed_down() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for (left, right) in [(1.0f32, 0.0f32), (0.5, -0.5), (-1.0, -1.0)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.samples(), &[0.5, 0.0, -1.0]);
    }

    #[test]
    fn wav_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("press.wav");
        let audio = ramp();
        write_wav(&path, &audio, WavFormat::Float32).unwrap();
        assert_eq!(read_wav(&path).unwrap(), audio);
    }
}
