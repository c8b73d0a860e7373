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

//! A sample-accurate metronome.
//!
//! Two pre-rendered click clips are loaded up front ([`clips`]); the
//! [`scheduler::BeatScheduler`] is then moved into the audio device's pull callback
//! and writes one sample at a time, placing a click at the start of every beat and
//! the accented click on the first beat of each bar.

pub mod audio;
pub mod clips;
pub mod controller;
pub mod playsync;
pub mod scheduler;
pub mod settings;
