//! VinylPress turns a photographed record into sound and back into a
//! picture. A square image of a disk is unspun into a flat strip, one row
//! per radius and one column per angle. The strip is played like a groove
//! to make audio, the audio is analysed into a spectrogram, and the
//! spectrogram is spun back around a disk to become the record's cover art.
//!
//! Each of those steps is a stage: [unspinner], [sonifier],
//! [spectrogrammer] and [spinner]. They can be called as plain functions,
//! chained through [press], or run as a threaded
//! [PressLine](press::PressLine) built from [component]s.
//!
//! The geometry shared by unspinning and spinning lives in
//! [polar_mapping], and every knob the stages read is in
//! [PressConfig](config::PressConfig).

#![warn(missing_docs)]
#[allow(missing_docs)]
pub mod args;
pub mod audio_buffer;
pub mod component;
pub mod config;
pub mod dummy_disk;
pub mod error;
pub mod monitor;
pub mod playback;
pub mod polar_mapping;
pub mod press;
pub mod raster;
pub mod sonifier;
pub mod spectrogrammer;
pub mod spinner;
pub mod unspinner;
pub mod wav;
