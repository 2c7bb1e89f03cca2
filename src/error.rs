//! The one error type shared by every stage of the press. Geometry and
//! computation failures are the interesting ones; the rest wrap the errors
//! of the libraries we lean on for files, images, and config.

use std::{borrow::Cow, fmt, sync::mpsc};

/// Everything that can go wrong while pressing a record.
#[derive(Debug)]
pub enum PressError {
    /// An input image violates a stage's shape precondition, e.g. a
    /// non-square disk handed to the Unspinner.
    InvalidGeometry(String),

    /// The transform stage hit numbers it cannot work with (NaN, infinity).
    Computation(String),

    /// A [PressConfig](crate::config::PressConfig) value is out of range.
    InvalidConfig(String),

    /// A pending computation was cancelled before it finished.
    Cancelled,

    /// A stage thread hung up its end of a channel.
    Pipeline(String),

    /// The playback sink could not play the buffer.
    Playback(String),

    /// Returned when io fails when reading or writing files.
    IoError(std::io::Error),

    /// Returned when reading or writing WAV data fails.
    HoundError(hound::Error),

    /// Returned when decoding or encoding an image fails.
    ImageError(image::ImageError),

    /// Returned when the config file cannot be parsed.
    RonSpannedError(ron::error::SpannedError),

    /// Returned when the config cannot be serialized.
    RonError(ron::Error),
}

/// Shorthand used by every fallible press operation.
pub type PressResult<T> = Result<T, PressError>;

impl fmt::Display for PressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PressError as PE;
        let msg = match self {
            PE::InvalidGeometry(why) => Cow::from(format!("invalid geometry: {}", why)),
            PE::Computation(why) => Cow::from(format!("computation error: {}", why)),
            PE::InvalidConfig(why) => Cow::from(format!("invalid config: {}", why)),
            PE::Cancelled => Cow::from("computation cancelled"),
            PE::Pipeline(why) => Cow::from(format!("pipeline error: {}", why)),
            PE::Playback(why) => Cow::from(format!("playback error: {}", why)),
            PE::IoError(error) => Cow::from(format!("io error: {}", error)),
            PE::HoundError(error) => Cow::from(format!("wav error: {}", error)),
            PE::ImageError(error) => Cow::from(format!("image error: {}", error)),
            PE::RonSpannedError(error) => Cow::from(format!("config parse error: {}", error)),
            PE::RonError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for PressError {}

impl From<std::io::Error> for PressError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<hound::Error> for PressError {
    fn from(value: hound::Error) -> Self {
        Self::HoundError(value)
    }
}

impl From<image::ImageError> for PressError {
    fn from(value: image::ImageError) -> Self {
        Self::ImageError(value)
    }
}

impl From<ron::error::SpannedError> for PressError {
    fn from(value: ron::error::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl From<ron::Error> for PressError {
    fn from(value: ron::Error) -> Self {
        Self::RonError(value)
    }
}

impl<T> From<mpsc::SendError<T>> for PressError {
    fn from(_: mpsc::SendError<T>) -> Self {
        Self::Pipeline("receiving stage hung up".to_string())
    }
}

impl From<mpsc::RecvError> for PressError {
    fn from(value: mpsc::RecvError) -> Self {
        Self::Pipeline(format!("sending stage hung up: {}", value))
    }
}
