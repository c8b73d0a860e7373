// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::process;

use beatclick::audio;
use beatclick::clips::ClipSet;
use beatclick::controller::keyboard;
use beatclick::playsync::ShutdownHandle;
use beatclick::scheduler::{validate_beats_per_bar, validate_bpm, BeatScheduler};
use beatclick::settings::{Overrides, Settings};
use clap::{crate_version, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_BPM: f64 = 120.0;
const DEFAULT_BEATS_PER_BAR: u32 = 1;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample-accurate metronome."
)]
struct Cli {
    /// Tempo in beats per minute, between 20 and 400.
    #[arg(allow_negative_numbers = true)]
    bpm: Option<f64>,

    /// Beats per bar, between 1 and 16. The first beat of each bar is accented when
    /// there is more than one.
    beats_per_bar: Option<u32>,

    /// The path to the metronome config. Defaults to metronome.yaml if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The audio device to play through.
    #[arg(short, long)]
    device: Option<String>,

    /// The normal click clip (raw 32-bit float PCM).
    #[arg(long)]
    low_clip: Option<String>,

    /// The accented click clip (raw 32-bit float PCM).
    #[arg(long)]
    high_clip: Option<String>,

    /// Lists the available audio output devices and exits.
    #[arg(long)]
    list_devices: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout and exit successfully.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.list_devices {
        let devices = audio::list_devices()?;

        if devices.is_empty() {
            println!("No devices found.");
            return Ok(());
        }

        println!("Devices:");
        for device in devices {
            println!("- {}", device);
        }
        return Ok(());
    }

    let bpm = match cli.bpm {
        Some(bpm) => {
            let bpm = validate_bpm(bpm)?;
            println!("using bpm {:.2}", bpm);
            bpm
        }
        None => {
            println!("using default bpm {:.2}", DEFAULT_BPM);
            DEFAULT_BPM
        }
    };
    let beats_per_bar =
        validate_beats_per_bar(cli.beats_per_bar.unwrap_or(DEFAULT_BEATS_PER_BAR))?;

    let settings = Settings::load(
        cli.config.as_deref(),
        Overrides {
            device: cli.device,
            low_clip: cli.low_clip,
            high_clip: cli.high_clip,
        },
    )?;

    // A single-beat bar never accents, so the second clip is only needed for longer bars.
    let high_clip = (beats_per_bar > 1).then(|| settings.high_clip());
    let clips = ClipSet::load(settings.low_clip(), high_clip, settings.clip_length())?;
    let scheduler = BeatScheduler::new(bpm, beats_per_bar, clips, settings.sample_rate())?;
    info!(scheduler = ?scheduler, "Scheduler ready");

    let device = audio::get_device(&settings)?;
    let shutdown = ShutdownHandle::new();
    let keyboard = keyboard::Driver::new().monitor_events(shutdown.clone());

    device.play(scheduler, shutdown)?;

    match keyboard.join() {
        Ok(result) => result?,
        Err(_) => return Err("keyboard driver panicked".into()),
    }

    Ok(())
}
