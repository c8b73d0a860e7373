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
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

/// The config file read when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "metronome.yaml";
/// Prefix for environment overrides, e.g. METRONOME_DEVICE.
pub const ENV_PREFIX: &str = "METRONOME";

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_CLIP_LENGTH: usize = 4800;
const DEFAULT_LOW_CLIP: &str = "click-48k-f32.bin";
const DEFAULT_HIGH_CLIP: &str = "click-accent-48k-f32.bin";

/// Typed error for settings load/parse failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Values supplied on the command line. These take precedence over the config file
/// and the environment.
#[derive(Default, Debug, Clone)]
pub struct Overrides {
    pub device: Option<String>,
    pub low_clip: Option<String>,
    pub high_clip: Option<String>,
}

/// Metronome settings.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    /// The audio output device. "default" picks the host's default output.
    device: String,

    /// The sample rate the device must run at.
    sample_rate: u32,

    /// The number of samples in each click clip.
    clip_length: usize,

    /// The normal click.
    low_clip: PathBuf,

    /// The accented click, only needed when a bar has more than one beat.
    high_clip: PathBuf,

    /// A fixed stream buffer size in frames. Uses the backend default when unset.
    buffer_size: Option<u32>,
}

impl Settings {
    /// Loads settings from defaults, the given (or default) config file, the
    /// environment and the command line, in increasing order of precedence.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Settings, ConfigError> {
        let file_source = match file {
            Some(file) => File::from(file).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .set_default("device", DEFAULT_DEVICE)?
            .set_default("sample_rate", i64::from(DEFAULT_SAMPLE_RATE))?
            .set_default("clip_length", DEFAULT_CLIP_LENGTH as i64)?
            .set_default("low_clip", DEFAULT_LOW_CLIP)?
            .set_default("high_clip", DEFAULT_HIGH_CLIP)?
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("device", overrides.device)?
            .set_override_option("low_clip", overrides.low_clip)?
            .set_override_option("high_clip", overrides.high_clip)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(settings = ?settings, "Loaded settings");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be greater than 0"));
        }
        if self.clip_length == 0 {
            return Err(ConfigError::Invalid("clip_length must be greater than 0"));
        }
        if self.buffer_size == Some(0) {
            return Err(ConfigError::Invalid("buffer_size must be greater than 0"));
        }
        Ok(())
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clip_length(&self) -> usize {
        self.clip_length
    }

    pub fn low_clip(&self) -> &Path {
        &self.low_clip
    }

    pub fn high_clip(&self) -> &Path {
        &self.high_clip
    }

    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "DEVICE",
            "SAMPLE_RATE",
            "CLIP_LENGTH",
            "LOW_CLIP",
            "HIGH_CLIP",
            "BUFFER_SIZE",
        ] {
            std::env::remove_var(format!("{}_{}", ENV_PREFIX, key));
        }
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metronome.yaml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let (_dir, path) = write_config("{}");
        let settings = Settings::load(Some(&path), Overrides::default()).unwrap();

        assert_eq!("default", settings.device());
        assert_eq!(48000, settings.sample_rate());
        assert_eq!(4800, settings.clip_length());
        assert_eq!(Path::new("click-48k-f32.bin"), settings.low_clip());
        assert_eq!(Path::new("click-accent-48k-f32.bin"), settings.high_clip());
        assert_eq!(None, settings.buffer_size());
    }

    #[test]
    #[serial]
    fn test_file_values() {
        clear_env();
        let (_dir, path) = write_config(
            "device: UltraLite-mk5\nsample_rate: 44100\nclip_length: 441\nlow_clip: /tmp/low.bin\nbuffer_size: 256\n",
        );
        let settings = Settings::load(Some(&path), Overrides::default()).unwrap();

        assert_eq!("UltraLite-mk5", settings.device());
        assert_eq!(44100, settings.sample_rate());
        assert_eq!(441, settings.clip_length());
        assert_eq!(Path::new("/tmp/low.bin"), settings.low_clip());
        assert_eq!(Some(256), settings.buffer_size());
    }

    #[test]
    #[serial]
    fn test_precedence() {
        clear_env();
        let (_dir, path) = write_config("device: from-file\nsample_rate: 44100\n");
        std::env::set_var("METRONOME_DEVICE", "from-env");
        std::env::set_var("METRONOME_SAMPLE_RATE", "96000");

        let settings = Settings::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!("from-env", settings.device());
        assert_eq!(96000, settings.sample_rate());

        let settings = Settings::load(
            Some(&path),
            Overrides {
                device: Some("from-cli".into()),
                low_clip: None,
                high_clip: Some("accent.bin".into()),
            },
        )
        .unwrap();
        assert_eq!("from-cli", settings.device());
        assert_eq!(Path::new("accent.bin"), settings.high_clip());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values() {
        clear_env();
        let (_dir, path) = write_config("sample_rate: 0\n");
        assert!(matches!(
            Settings::load(Some(&path), Overrides::default()),
            Err(ConfigError::Invalid(_))
        ));

        let (_dir, path) = write_config("clip_length: 0\n");
        assert!(matches!(
            Settings::load(Some(&path), Overrides::default()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load(Some(&dir.path().join("nope.yaml")), Overrides::default()),
            Err(ConfigError::Load(_))
        ));
    }
}
