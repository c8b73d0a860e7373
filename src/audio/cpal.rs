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
use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use crate::audio::thread_priority::AudioThreadPriority;
use crate::audio::{Device as AudioDevice, DeviceError, CHANNELS};
use crate::playsync::ShutdownHandle;
use crate::scheduler::BeatScheduler;

/// The name that selects the host's default output device.
const DEFAULT_DEVICE: &str = "default";

/// A small wrapper around a cpal::Device along with the stream configuration that was
/// negotiated for it.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The negotiated stream configuration. Unset for listed devices.
    stream_config: Option<cpal::StreamConfig>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, DeviceError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that have at least one output configuration.
    fn list_cpal_devices() -> Result<Vec<Device>, DeviceError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        stream_config: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and negotiates a mono f32 stream at the given sample
    /// rate. "default" selects the default output device of the default host.
    pub fn get(
        name: &str,
        sample_rate: u32,
        buffer_size: Option<u32>,
    ) -> Result<Device, DeviceError> {
        let mut device = if name == DEFAULT_DEVICE {
            Device::default_output()?
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| DeviceError::NotFound(name.to_string()))?
        };

        device.stream_config = Some(device.negotiate(sample_rate, buffer_size)?);
        info!(
            device = device.name,
            host = device.host_id.name(),
            sample_rate,
            "Negotiated audio device"
        );
        Ok(device)
    }

    fn default_output() -> Result<Device, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| DeviceError::NotFound(DEFAULT_DEVICE.to_string()))?;
        let max_channels = device
            .supported_output_configs()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0);

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
            stream_config: None,
        })
    }

    /// Finds a supported output configuration that matches the requested format
    /// exactly. The metronome never resamples, so anything else is an error.
    fn negotiate(
        &self,
        sample_rate: u32,
        buffer_size: Option<u32>,
    ) -> Result<cpal::StreamConfig, DeviceError> {
        let supported = self.device.supported_output_configs()?.any(|range| {
            range.channels() == CHANNELS
                && range.sample_format() == cpal::SampleFormat::F32
                && range.min_sample_rate() <= sample_rate
                && sample_rate <= range.max_sample_rate()
        });

        if !supported {
            return Err(DeviceError::Negotiation {
                device: self.name.clone(),
                sample_rate,
            });
        }

        Ok(cpal::StreamConfig {
            channels: CHANNELS,
            sample_rate,
            buffer_size: match buffer_size {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        })
    }
}

impl AudioDevice for Device {
    fn play(
        &self,
        mut scheduler: BeatScheduler,
        shutdown: ShutdownHandle,
    ) -> Result<(), DeviceError> {
        let span = span!(Level::INFO, "play metronome (cpal)");
        let _enter = span.enter();

        let config = self
            .stream_config
            .clone()
            .ok_or_else(|| DeviceError::Negotiation {
                device: self.name.clone(),
                sample_rate: scheduler.sample_rate(),
            })?;

        info!(
            device = self.name,
            bpm = scheduler.bpm(),
            beats_per_bar = scheduler.beats_per_bar(),
            period = scheduler.period(),
            "Playing metronome."
        );

        let mut priority = AudioThreadPriority::from_env();
        let stream = self.device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                priority.apply_once();
                scheduler.fill(data);
            },
            |err| error!("CPAL output stream error: {}", err),
            None,
        )?;

        stream.play()?;
        info!("CPAL output stream started successfully");

        shutdown.wait();

        // Dropping the stream closes the device; no further callbacks are made.
        drop(stream);
        info!(device = self.name, "Metronome stopped.");
        Ok(())
    }
}
