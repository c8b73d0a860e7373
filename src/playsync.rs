// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Represents the current run state.
#[derive(PartialEq, Debug, Clone, Copy)]
enum RunState {
    Running,
    Stopping,
}

/// A shutdown handle is shared between whatever decides that playback is over (the
/// keyboard, a test) and the device, which holds its stream open until asked to stop.
#[derive(Clone)]
pub struct ShutdownHandle {
    state: Arc<Mutex<RunState>>,
    condvar: Arc<Condvar>,
}

impl ShutdownHandle {
    /// Creates a new shutdown handle.
    pub fn new() -> ShutdownHandle {
        ShutdownHandle {
            state: Arc::new(Mutex::new(RunState::Running)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.state.lock().expect("Error getting lock") == RunState::Stopping
    }

    /// Blocks until shutdown is requested.
    pub fn wait(&self) {
        let _unused = self
            .condvar
            .wait_while(self.state.lock().expect("Error getting lock"), |state| {
                *state == RunState::Running
            })
            .expect("Error getting lock");
    }

    /// Blocks until shutdown is requested or the timeout elapses. Returns true if
    /// shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (state, _) = self
            .condvar
            .wait_timeout_while(
                self.state.lock().expect("Error getting lock"),
                timeout,
                |state| *state == RunState::Running,
            )
            .expect("Error getting lock");
        *state == RunState::Stopping
    }

    /// Requests shutdown and wakes every waiter. Requesting more than once is harmless.
    pub fn request(&self) {
        let mut state = self.state.lock().expect("Error getting lock");
        if *state == RunState::Running {
            *state = RunState::Stopping;
            self.condvar.notify_all();
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn test_shutdown_wakes_waiter() {
        let shutdown = ShutdownHandle::new();
        assert!(!shutdown.is_requested());

        let join = {
            let shutdown = shutdown.clone();
            thread::spawn(move || shutdown.wait())
        };

        shutdown.request();
        assert!(join.join().is_ok());
        assert!(shutdown.is_requested());
    }

    #[test]
    fn test_wait_after_request_returns() {
        let shutdown = ShutdownHandle::new();
        shutdown.request();
        shutdown.request();
        shutdown.wait();
        assert!(shutdown.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let shutdown = ShutdownHandle::new();
        assert!(!shutdown.wait_timeout(Duration::from_millis(10)));
        assert!(!shutdown.is_requested());
    }
}
