//! Command line front end for the press. Every subcommand reads and writes
//! plain files: PNG images and WAV audio.

use clap::Parser;
use log::{info, warn};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use vinylpress::{
    args::{CommandTask, PressArgs},
    audio_buffer::AudioBuffer,
    config::PressConfig,
    dummy_disk::DummyDisk,
    error::PressResult,
    monitor::finish_spectrogram,
    playback::{play, AudioSink, WavSink},
    press::{press_with, PressLine},
    raster::RasterImage,
    sonifier::sonify,
    spectrogrammer::spectrogram,
    spinner::spin,
    unspinner::unspin,
    wav::{read_wav, write_wav, WavFormat},
};

// Example:
// cargo run -- demo -o disk.png --rings 80 200 --spokes 12
// cargo run -- press disk.png --out-dir pressed --watch
// cargo run -- batch -f a.png b.png --out-dir covers -c press.ron

fn main() -> ExitCode {
    env_logger::init();
    let args = PressArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("vinylpress: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &PressArgs) -> PressResult<PressConfig> {
    let mut config = match &args.config {
        Some(path) => PressConfig::from_path(path)?,
        None => PressConfig::default(),
    };
    if let Some(rate) = args.samp_rate {
        config.sample_rate = rate;
    }
    config.validate()?;
    Ok(config)
}

fn wav_format(int16: bool) -> WavFormat {
    if int16 {
        WavFormat::Int16
    } else {
        WavFormat::Float32
    }
}

fn run(args: PressArgs) -> PressResult<()> {
    let config = load_config(&args)?;

    match args.command {
        CommandTask::Unspin(cmd) => {
            let disk = RasterImage::from_path(&cmd.input)?;
            unspin(&disk, &config)?.to_path(&cmd.output)?;
        }

        CommandTask::Sonify(cmd) => {
            let strip = RasterImage::from_path(&cmd.input)?;
            let audio = sonify(&strip, &config);
            write_wav(&cmd.output, &audio, wav_format(cmd.int16))?;
        }

        CommandTask::Spectrogram(cmd) => {
            let audio = read_wav(&cmd.input)?;
            let image = finish_spectrogram(spectrogram(audio, &config), cmd.watch)?;
            image.to_path(&cmd.output)?;
        }

        CommandTask::Spin(cmd) => {
            let strip = RasterImage::from_path(&cmd.input)?;
            spin(&strip, &config).to_path(&cmd.output)?;
        }

        CommandTask::Press(cmd) => {
            let disk = RasterImage::from_path(&cmd.input)?;
            let watch = cmd.watch;
            let pressing = press_with(&disk, &config, |pending| {
                finish_spectrogram(pending, watch)
            })?;

            fs::create_dir_all(&cmd.out_dir)?;
            pressing.strip.to_path(cmd.out_dir.join("strip.png"))?;
            write_wav(
                cmd.out_dir.join("groove.wav"),
                &pressing.audio,
                wav_format(cmd.int16),
            )?;
            pressing.spectrogram.to_path(cmd.out_dir.join("spectrogram.png"))?;
            pressing.cover_art.to_path(cmd.out_dir.join("cover.png"))?;
            info!("pressed {} into {}", cmd.input.display(), cmd.out_dir.display());
        }

        CommandTask::Batch(cmd) => {
            fs::create_dir_all(&cmd.out_dir)?;
            let mut line = PressLine::new(&config)?;
            let mut outputs = Vec::new();
            let names = cover_paths(&cmd.out_dir, &cmd.filenames);

            for (file, output) in cmd.filenames.iter().zip(names) {
                match RasterImage::from_path(file) {
                    Ok(disk) => {
                        line.submit(disk)?;
                        outputs.push(output);
                    }
                    Err(error) => warn!("skipping {}: {}", file.display(), error),
                }
            }

            for (output, result) in outputs.iter().zip(line.shutdown()) {
                match result {
                    Ok(art) => {
                        art.to_path(output)?;
                        info!("wrote {}", output.display());
                    }
                    Err(error) => warn!("no cover art for {}: {}", output.display(), error),
                }
            }
        }

        CommandTask::Demo(cmd) => {
            let disk = cmd
                .rings
                .iter()
                .fold(DummyDisk::builder().size(cmd.size), |disk, &radius| {
                    disk.ring(radius, cmd.ring_width)
                })
                .spokes(cmd.spokes)
                .noise(cmd.noise)
                .seed(cmd.seed)
                .build()?;
            disk.to_path(&cmd.output)?;
        }

        CommandTask::Play(cmd) => {
            let audio = load_audio(&cmd.input, &config)?;
            let mut sink = open_sink(cmd.to_wav)?;
            play(&audio, sink.as_mut())?;
        }
    }

    Ok(())
}

/// `<out_dir>/<stem>-cover.png` for each disk. Disks sharing a stem get
/// `<stem>-2-cover.png`, `<stem>-3-cover.png` and so on, in input order.
fn cover_paths(out_dir: &Path, disks: &[PathBuf]) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    disks
        .iter()
        .map(|disk| {
            let stem = disk.file_stem().unwrap_or_else(|| OsStr::new("disk"));
            let stem = stem.to_string_lossy();
            let mut name = format!("{}-cover.png", stem);
            let mut copy = 1;
            while !taken.insert(name.clone()) {
                copy += 1;
                name = format!("{}-{}-cover.png", stem, copy);
            }
            out_dir.join(name)
        })
        .collect()
}

/// WAV files are played as they are; anything else is taken to be a disk
/// image and pressed into audio first.
fn load_audio(path: &Path, config: &PressConfig) -> PressResult<AudioBuffer> {
    let is_wav = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        read_wav(path)
    } else {
        let disk = RasterImage::from_path(path)?;
        Ok(sonify(&unspin(&disk, config)?, config))
    }
}

fn open_sink(to_wav: Option<PathBuf>) -> PressResult<Box<dyn AudioSink>> {
    if let Some(path) = to_wav {
        return Ok(Box::new(WavSink::new(path, WavFormat::Float32)));
    }

    #[cfg(feature = "playback")]
    {
        Ok(Box::new(vinylpress::playback::DeviceSink::new()))
    }
    #[cfg(not(feature = "playback"))]
    {
        Err(vinylpress::error::PressError::Playback(
            "built without the `playback` feature, pass --to <file.wav>".to_string(),
        ))
    }
}
