//! Monaural sample buffer passed from the Sonifier onwards.

/// A run of mono `f32` samples, nominally in [-1,1], at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Wraps `samples` recorded at `sample_rate` Hz.
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// `length` samples of silence.
    pub fn silent(sample_rate: u32, length: usize) -> Self {
        Self::new(sample_rate, vec![0.0; length])
    }

    /// Samples per second
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The samples, in order
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consumes the buffer, handing back its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when there are no samples at all
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playing time in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Index of the first sample that is NaN or infinite, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }
}
