// Commandline argument parser using clap for VinylPress

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct PressArgs {
    #[command(subcommand, long_about)]
    /// Which part of the press to run
    pub command: CommandTask,

    /// RON file with press settings; anything left out keeps its default
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Sample rate of the pressed audio, in Hz. Overrides the config file
    #[arg(short = 's', long = "samp", global = true)]
    pub samp_rate: Option<u32>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Unwrap a square disk image into a flat strip
    #[command(about)]
    Unspin(ImageCommand),

    /// Play a strip image as a groove and write the audio to a WAV file
    #[command(about)]
    Sonify(SonifyCommand),

    /// Compute the spectrogram image of a WAV file
    #[command(about)]
    Spectrogram(SpectrogramCommand),

    /// Wrap a strip or spectrogram image back around a disk
    #[command(about)]
    Spin(ImageCommand),

    /// Run a disk through every stage, writing each intermediate
    #[command(about)]
    Press(PressCommand),

    /// Make cover art for many disks at once
    #[command(about)]
    Batch(BatchCommand),

    /// Draw a synthetic disk with rings and spokes
    #[command(about)]
    Demo(DemoCommand),

    /// Play a disk image or WAV file
    #[command(about)]
    Play(PlayCommand),
}

#[derive(Debug, Args, Clone)]
pub struct ImageCommand {
    /// Image to read
    pub input: PathBuf,

    /// Image to write; the format follows the extension
    #[arg(short = 'o', long = "out")]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SonifyCommand {
    /// Strip image to play
    pub input: PathBuf,

    /// WAV file for the audio
    #[arg(short = 'o', long = "out")]
    pub output: PathBuf,

    /// Write 16-bit PCM instead of 32-bit float
    #[arg(long)]
    pub int16: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SpectrogramCommand {
    /// WAV file to analyse
    pub input: PathBuf,

    /// Image to write the spectrogram to
    #[arg(short = 'o', long = "out")]
    pub output: PathBuf,

    /// Show a progress bar; any key cancels
    #[arg(short, long)]
    pub watch: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PressCommand {
    /// Disk image to press
    pub input: PathBuf,

    /// Directory for strip.png, groove.wav, spectrogram.png and cover.png
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: PathBuf,

    /// Show a progress bar while the spectrogram runs; any key cancels
    #[arg(short, long)]
    pub watch: bool,

    /// Write 16-bit PCM instead of 32-bit float
    #[arg(long)]
    pub int16: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchCommand {
    /// Disk images to press
    #[arg(short = 'f', long = "files")]
    #[clap(num_args = 1.., required = true)]
    pub filenames: Vec<PathBuf>,

    /// Directory the cover art is written to, one <name>-cover.png per disk
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct DemoCommand {
    /// Image to write the disk to
    #[arg(short = 'o', long = "out")]
    pub output: PathBuf,

    /// Side length of the disk in pixels
    #[arg(long, default_value_t = 512)]
    pub size: u32,

    /// Radii of the rings to draw, in pixels
    #[arg(short = 'r', long = "rings")]
    #[clap(num_args = 1..)]
    pub rings: Vec<f32>,

    /// Width of every ring, in pixels
    #[arg(long, default_value_t = 6.0)]
    pub ring_width: f32,

    /// Number of spokes
    #[arg(long, default_value_t = 0)]
    pub spokes: u32,

    /// Amount of uniform noise added to each pixel
    #[arg(long, default_value_t = 0.0)]
    pub noise: f32,

    /// Seed for the noise
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct PlayCommand {
    /// Disk image (pressed first) or WAV file
    pub input: PathBuf,

    /// Write to this WAV file instead of the sound device
    #[arg(long = "to")]
    pub to_wav: Option<PathBuf>,
}
