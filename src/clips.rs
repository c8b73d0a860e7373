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

//! Click clip loading.
//!
//! Clips are raw, headerless, mono 32-bit float PCM in native byte order. They are
//! loaded entirely into memory before the audio device starts and are never written
//! to again, so the audio thread can read them without synchronization.

use std::fs::File;
use std::io::{self, Read};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

/// Errors that can occur while loading clips.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("unable to open clip {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("error reading clip {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("clip {} is truncated: expected {expected} bytes, found {actual}", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("clip lengths differ: low clip has {low} samples, high clip has {high}")]
    LengthMismatch { low: usize, high: usize },

    #[error("clip length must be greater than 0")]
    Empty,
}

/// Loads exactly `len` samples from the file at `path`.
pub fn load(path: &Path, len: usize) -> Result<Vec<f32>, ClipError> {
    info!(path = ?path, samples = len, "Loading clip");

    let file = File::open(path).map_err(|source| ClipError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    read_clip(path, file, len)
}

/// Reads exactly `len` samples from the given reader. Short reads are retried until
/// enough bytes have been collected or the reader is exhausted. Anything beyond the
/// requested length is left unread.
pub fn read_clip<R: Read>(name: &Path, mut reader: R, len: usize) -> Result<Vec<f32>, ClipError> {
    if len == 0 {
        return Err(ClipError::Empty);
    }

    let expected = len * size_of::<f32>();
    let mut bytes = vec![0u8; expected];
    let mut read = 0;
    while read < expected {
        match reader.read(&mut bytes[read..]) {
            Ok(0) => {
                return Err(ClipError::Truncated {
                    path: name.to_path_buf(),
                    expected,
                    actual: read,
                })
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ClipError::Read {
                    path: name.to_path_buf(),
                    source,
                })
            }
        }
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(size_of::<f32>())
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    debug!(path = ?name, samples = samples.len(), "Clip read");
    Ok(samples)
}

/// The pair of clips a metronome plays: a normal click and an accented click for the
/// first beat of a bar. Cloning is cheap; the sample data is shared.
#[derive(Clone, Debug)]
pub struct ClipSet {
    low: Arc<[f32]>,
    high: Arc<[f32]>,
}

impl ClipSet {
    /// Pairs the given clips. If no high clip is given, the low clip is used for both.
    pub fn new(low: Vec<f32>, high: Option<Vec<f32>>) -> Result<ClipSet, ClipError> {
        if low.is_empty() {
            return Err(ClipError::Empty);
        }

        let low: Arc<[f32]> = low.into();
        let high: Arc<[f32]> = match high {
            Some(high) => {
                if high.len() != low.len() {
                    return Err(ClipError::LengthMismatch {
                        low: low.len(),
                        high: high.len(),
                    });
                }
                high.into()
            }
            None => low.clone(),
        };

        Ok(ClipSet { low, high })
    }

    /// Loads the clip set from disk. The high clip is optional.
    pub fn load(low: &Path, high: Option<&Path>, len: usize) -> Result<ClipSet, ClipError> {
        let low = load(low, len)?;
        let high = high.map(|high| load(high, len)).transpose()?;
        ClipSet::new(low, high)
    }

    /// The normal click.
    #[inline]
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// The accented click.
    #[inline]
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// The number of samples in each clip.
    #[inline]
    pub fn len(&self) -> usize {
        self.low.len()
    }

    /// Always false: empty clip sets cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    /// Returns true if the low and high clips share the same data.
    pub fn is_single(&self) -> bool {
        Arc::ptr_eq(&self.low, &self.high)
    }
}
