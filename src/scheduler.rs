// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

//! Per-sample beat scheduling.
//!
//! The scheduler is owned by the audio callback and filled one device buffer at a
//! time. Phase is tracked as a fractional sample offset within the current beat; when
//! it passes the beat period the period is subtracted rather than the phase being
//! reset, so the fractional remainder carries into the next beat and the average beat
//! spacing converges on the exact tempo.

use std::fmt;

use crate::clips::ClipSet;

/// The slowest supported tempo.
pub const MIN_BPM: f64 = 20.0;
/// The fastest supported tempo.
pub const MAX_BPM: f64 = 400.0;
/// The smallest supported bar.
pub const MIN_BEATS_PER_BAR: u32 = 1;
/// The largest supported bar.
pub const MAX_BEATS_PER_BAR: u32 = 16;

/// Rejected scheduler parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("bpm must be between 20 and 400, got {0}")]
    Bpm(f64),

    #[error("beats per bar must be between 1 and 16, got {0}")]
    BeatsPerBar(u32),

    #[error("sample rate must be greater than 0")]
    SampleRate,
}

/// Checks that the tempo is within the supported range.
pub fn validate_bpm(bpm: f64) -> Result<f64, ValidationError> {
    // NaN is never contained.
    if (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(bpm)
    } else {
        Err(ValidationError::Bpm(bpm))
    }
}

/// Checks that the bar length is within the supported range.
pub fn validate_beats_per_bar(beats_per_bar: u32) -> Result<u32, ValidationError> {
    if (MIN_BEATS_PER_BAR..=MAX_BEATS_PER_BAR).contains(&beats_per_bar) {
        Ok(beats_per_bar)
    } else {
        Err(ValidationError::BeatsPerBar(beats_per_bar))
    }
}

/// Which of the two clips sounds on a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Low,
    High,
}

impl Click {
    /// The accent is only used on the first beat of the bar, and only when a bar has
    /// more than one beat.
    #[inline]
    pub fn for_beat(beat_index: u32, beats_per_bar: u32) -> Click {
        if beats_per_bar > 1 && beat_index == 0 {
            Click::High
        } else {
            Click::Low
        }
    }
}

/// Samples per beat for the given tempo.
#[inline]
pub fn period(bpm: f64, sample_rate: u32) -> f64 {
    60.0 / bpm * sample_rate as f64
}

/// The metronome state machine. Not thread safe by itself: it is meant to be moved
/// into the audio callback and mutated only from there.
pub struct BeatScheduler {
    clips: ClipSet,
    bpm: f64,
    sample_rate: u32,
    period: f64,
    beats_per_bar: u32,
    phase: f64,
    beat_index: u32,
}

impl BeatScheduler {
    /// Creates a new scheduler positioned at the start of the first beat of a bar.
    pub fn new(
        bpm: f64,
        beats_per_bar: u32,
        clips: ClipSet,
        sample_rate: u32,
    ) -> Result<BeatScheduler, ValidationError> {
        let bpm = validate_bpm(bpm)?;
        let beats_per_bar = validate_beats_per_bar(beats_per_bar)?;
        if sample_rate == 0 {
            return Err(ValidationError::SampleRate);
        }

        Ok(BeatScheduler {
            clips,
            bpm,
            sample_rate,
            period: period(bpm, sample_rate),
            beats_per_bar,
            phase: 0.0,
            beat_index: 0,
        })
    }

    /// Fills the output buffer with the next samples of the click track. Runs on the
    /// real-time audio thread: no allocation, no locking, no I/O.
    pub fn fill(&mut self, output: &mut [f32]) {
        let clip_len = self.clips.len();
        let clip_end = clip_len as f64;
        let period = self.period;
        let beats_per_bar = self.beats_per_bar;
        let mut phase = self.phase;
        let mut beat_index = self.beat_index;

        for sample in output.iter_mut() {
            let clip = match Click::for_beat(beat_index, beats_per_bar) {
                Click::High => self.clips.high(),
                Click::Low => self.clips.low(),
            };

            *sample = if phase < clip_end {
                clip[(phase as usize) % clip_len]
            } else {
                0.0
            };

            phase += 1.0;
            if phase > period {
                phase -= period;
                beat_index = (beat_index + 1) % beats_per_bar;
            }
        }

        self.phase = phase;
        self.beat_index = beat_index;
    }

    /// The clip that the next sample will be drawn from.
    pub fn click(&self) -> Click {
        Click::for_beat(self.beat_index, self.beats_per_bar)
    }

    /// Returns true if the current beat is accented.
    pub fn is_accented(&self) -> bool {
        self.click() == Click::High
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per beat.
    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Fractional sample offset since the start of the current beat.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Index of the beat currently sounding within the bar.
    pub fn beat_index(&self) -> u32 {
        self.beat_index
    }

    /// The clips this scheduler plays.
    pub fn clips(&self) -> &ClipSet {
        &self.clips
    }
}

impl fmt::Debug for BeatScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeatScheduler")
            .field("bpm", &self.bpm)
            .field("sample_rate", &self.sample_rate)
            .field("period", &self.period)
            .field("beats_per_bar", &self.beats_per_bar)
            .field("phase", &self.phase)
            .field("beat_index", &self.beat_index)
            .field("clip_len", &self.clips.len())
            .finish()
    }
}
