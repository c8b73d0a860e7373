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
use std::fmt;

use crate::playsync::ShutdownHandle;
use crate::scheduler::BeatScheduler;
use crate::settings::Settings;

pub mod cpal;
pub mod mock;
pub mod thread_priority;

/// The metronome always plays a single channel.
pub const CHANNELS: u16 = 1;

/// Errors from finding, negotiating with, or driving an audio device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no device found with name {0}")]
    NotFound(String),

    #[error("device {device} cannot play mono 32-bit float audio at {sample_rate} Hz")]
    Negotiation { device: String, sample_rate: u32 },

    #[error("audio host unavailable: {0}")]
    Host(#[from] ::cpal::HostUnavailable),

    #[error("unable to list devices: {0}")]
    Devices(#[from] ::cpal::DevicesError),

    #[error("unable to read device name: {0}")]
    Name(#[from] ::cpal::DeviceNameError),

    #[error("unable to query device configurations: {0}")]
    SupportedConfigs(#[from] ::cpal::SupportedStreamConfigsError),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] ::cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] ::cpal::PlayStreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("playback thread panicked")]
    Panicked,
}

pub trait Device: fmt::Display + Send + Sync {
    /// Plays the click track until shutdown is requested. The scheduler is handed to
    /// the audio callback, which has exclusive use of it for the lifetime of the stream.
    fn play(&self, scheduler: BeatScheduler, shutdown: ShutdownHandle) -> Result<(), DeviceError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, DeviceError> {
    cpal::Device::list()
}

/// Gets the device named in the settings, negotiated for the configured sample rate.
pub fn get_device(settings: &Settings) -> Result<Box<dyn Device>, DeviceError> {
    let device = settings.device();
    if device.starts_with("mock") {
        return Ok(Box::new(mock::Device::get(device)));
    };

    Ok(Box::new(cpal::Device::get(
        device,
        settings.sample_rate(),
        settings.buffer_size(),
    )?))
}
