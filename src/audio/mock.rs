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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{info, span, Level};

use crate::audio::DeviceError;
use crate::playsync::ShutdownHandle;
use crate::scheduler::BeatScheduler;

/// Frames requested per simulated callback.
const BLOCK_FRAMES: usize = 512;

/// A mock device. Pulls buffers from the scheduler at roughly real-time pace on a
/// plain thread, but doesn't play anything.
#[derive(Clone)]
pub struct Device {
    name: String,
    is_playing: Arc<AtomicBool>,
    frames_rendered: Arc<AtomicU64>,
    clicks_rendered: Arc<AtomicU64>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            is_playing: Arc::new(AtomicBool::new(false)),
            frames_rendered: Arc::new(AtomicU64::new(0)),
            clicks_rendered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns true if the device is currently playing.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }

    /// The number of frames pulled from the scheduler so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// The number of non-silent frames pulled from the scheduler so far.
    pub fn clicks_rendered(&self) -> u64 {
        self.clicks_rendered.load(Ordering::Relaxed)
    }
}

impl crate::audio::Device for Device {
    fn play(
        &self,
        mut scheduler: BeatScheduler,
        shutdown: ShutdownHandle,
    ) -> Result<(), DeviceError> {
        let span = span!(Level::INFO, "play metronome (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            bpm = scheduler.bpm(),
            beats_per_bar = scheduler.beats_per_bar(),
            "Playing metronome."
        );

        let block_duration =
            Duration::from_secs_f64(BLOCK_FRAMES as f64 / scheduler.sample_rate() as f64);

        self.is_playing.store(true, Ordering::Relaxed);
        let join_handle = {
            let shutdown = shutdown.clone();
            let frames_rendered = self.frames_rendered.clone();
            let clicks_rendered = self.clicks_rendered.clone();
            thread::spawn(move || {
                let mut buffer = vec![0.0f32; BLOCK_FRAMES];
                loop {
                    scheduler.fill(&mut buffer);
                    let clicks = buffer.iter().filter(|sample| **sample != 0.0).count();
                    frames_rendered.fetch_add(BLOCK_FRAMES as u64, Ordering::Relaxed);
                    clicks_rendered.fetch_add(clicks as u64, Ordering::Relaxed);

                    if shutdown.wait_timeout(block_duration) {
                        break;
                    }
                }
            })
        };

        shutdown.wait();
        let join_result = join_handle.join();

        self.is_playing.store(false, Ordering::Relaxed);
        info!(device = self.name, "Metronome stopped.");

        join_result.map_err(|_| DeviceError::Panicked)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;
    use crate::audio::Device as _;
    use crate::clips::ClipSet;
    use crate::test::eventually;

    #[test]
    fn test_play_until_shutdown() {
        let device = Device::get("mock-device");
        let clips = ClipSet::new(vec![0.5; 480], None).unwrap();
        let scheduler = BeatScheduler::new(400.0, 4, clips, 48000).unwrap();
        let shutdown = ShutdownHandle::new();

        let join = {
            let device = device.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || device.play(scheduler, shutdown))
        };

        eventually(|| device.is_playing(), "Device never started playing");
        eventually(
            || device.frames_rendered() >= 7200,
            "Device never rendered a full beat",
        );
        assert!(device.clicks_rendered() >= 480);

        shutdown.request();
        assert!(join.join().unwrap().is_ok());
        assert!(!device.is_playing());

        let rendered = device.frames_rendered();
        assert_eq!(0, rendered % BLOCK_FRAMES as u64);
    }

    #[test]
    fn test_display() {
        assert_eq!("mock-thing (Mock)", Device::get("mock-thing").to_string());
    }
}
