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

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the audio callback thread when METRONOME_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

const THREAD_PRIORITY_VAR: &str = "METRONOME_THREAD_PRIORITY";
const DISABLE_RT_AUDIO_VAR: &str = "METRONOME_DISABLE_RT_AUDIO";

/// Parses a 0-99 priority, falling back to the default for anything else.
fn parse_priority(value: Option<&str>) -> u8 {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY)
}

fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Raises the priority of the audio callback thread the first time the callback runs.
/// The environment is read when this is built so the callback never touches it.
pub struct AudioThreadPriority {
    priority: Option<ThreadPriorityValue>,
    rt_audio: bool,
    applied: bool,
}

impl AudioThreadPriority {
    /// Reads METRONOME_THREAD_PRIORITY (0-99) and METRONOME_DISABLE_RT_AUDIO. RT
    /// (SCHED_FIFO) scheduling is attempted unless disabled.
    pub fn from_env() -> AudioThreadPriority {
        let priority = parse_priority(std::env::var(THREAD_PRIORITY_VAR).ok().as_deref());
        let disable_rt = parse_flag(std::env::var(DISABLE_RT_AUDIO_VAR).ok().as_deref());
        AudioThreadPriority {
            priority: ThreadPriorityValue::try_from(priority).ok(),
            rt_audio: !disable_rt,
            applied: false,
        }
    }

    /// Applies the priority to the current thread. Only the first call does anything.
    pub fn apply_once(&mut self) {
        if self.applied {
            return;
        }
        self.applied = true;

        let Some(priority) = self.priority else {
            return;
        };
        let tp = ThreadPriority::Crossplatform(priority);
        let _ = set_current_thread_priority(tp);

        #[cfg(unix)]
        if self.rt_audio {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            let tid = thread_native_id();
            match set_thread_priority_and_policy(
                tid,
                tp,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            ) {
                Ok(()) => {
                    info!("Enabled RT SCHED_FIFO for audio callback thread");
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "Failed to set RT SCHED_FIFO for audio callback thread"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_parse_priority() {
        assert_eq!(70, parse_priority(None));
        assert_eq!(10, parse_priority(Some("10")));
        assert_eq!(99, parse_priority(Some(" 99 ")));
        assert_eq!(70, parse_priority(Some("100")));
        assert_eq!(70, parse_priority(Some("high")));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("TRUE")));
        assert!(parse_flag(Some("yes")));
        assert!(parse_flag(Some("On")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(DISABLE_RT_AUDIO_VAR, "1");
        std::env::set_var(THREAD_PRIORITY_VAR, "42");
        let priority = AudioThreadPriority::from_env();
        assert!(!priority.rt_audio);
        assert!(priority.priority.is_some());
        std::env::remove_var(DISABLE_RT_AUDIO_VAR);
        std::env::remove_var(THREAD_PRIORITY_VAR);

        let mut priority = AudioThreadPriority::from_env();
        assert!(priority.rt_audio);
        priority.rt_audio = false;
        priority.apply_once();
        assert!(priority.applied);
    }
}
