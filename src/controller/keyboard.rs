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
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, span, Level};

use super::Event;
use crate::playsync::ShutdownHandle;

const QUIT: u8 = b'q';

/// A controller that stops the metronome from the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads a single character. End of input counts as a quit.
    fn read_event<R>(reader: &mut R) -> Result<Option<Event>, io::Error>
    where
        R: Read,
    {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Ok(Some(Event::Quit)),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if byte[0].to_ascii_lowercase() == QUIT {
            Ok(Some(Event::Quit))
        } else {
            debug!(input = byte[0], "Ignoring input");
            Ok(None)
        }
    }

    /// Prompts, then reads input until a quit is seen and requests shutdown. Shutdown
    /// is also requested if reading fails.
    fn monitor_io<R, W>(
        shutdown: &ShutdownHandle,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), io::Error>
    where
        R: Read,
        W: Write,
    {
        writeln!(writer, "Press q then enter to quit.")?;
        writer.flush()?;

        let result = loop {
            match Self::read_event(&mut reader) {
                Ok(Some(Event::Quit)) => break Ok(()),
                Ok(None) => continue,
                Err(e) => break Err(e),
            }
        };

        shutdown.request();
        result
    }

    /// Watches standard input on its own thread.
    pub fn monitor_events(&self, shutdown: ShutdownHandle) -> JoinHandle<Result<(), io::Error>> {
        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");
            let result = Self::monitor_io(&shutdown, io::stdin().lock(), io::stdout());
            info!("Keyboard driver stopped.");
            result
        })
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, Cursor};

    use super::*;

    fn monitor(input: &str) -> Result<(ShutdownHandle, String), io::Error> {
        let shutdown = ShutdownHandle::new();
        let mut output: Vec<u8> = Vec::new();
        Driver::monitor_io(&shutdown, Cursor::new(input.as_bytes().to_vec()), &mut output)?;
        Ok((shutdown, String::from_utf8(output).unwrap()))
    }

    #[test]
    fn test_read_event() -> Result<(), io::Error> {
        assert_eq!(Some(Event::Quit), Driver::read_event(&mut Cursor::new("q"))?);
        assert_eq!(Some(Event::Quit), Driver::read_event(&mut Cursor::new("Q"))?);
        assert_eq!(Some(Event::Quit), Driver::read_event(&mut Cursor::new(""))?);
        assert_eq!(None, Driver::read_event(&mut Cursor::new("x"))?);
        assert_eq!(None, Driver::read_event(&mut Cursor::new("\n"))?);
        Ok(())
    }

    #[test]
    fn test_quit_requests_shutdown() -> Result<(), io::Error> {
        let (shutdown, output) = monitor("abc\nQ\n")?;
        assert!(shutdown.is_requested());
        assert!(output.contains("q"));
        Ok(())
    }

    #[test]
    fn test_end_of_input_requests_shutdown() -> Result<(), io::Error> {
        let (shutdown, _) = monitor("hello\n")?;
        assert!(shutdown.is_requested());
        Ok(())
    }

    #[test]
    fn test_input_after_quit_is_not_read() -> Result<(), io::Error> {
        let shutdown = ShutdownHandle::new();
        let mut reader = Cursor::new("xqrest".as_bytes().to_vec());
        Driver::monitor_io(&shutdown, &mut reader, io::sink())?;
        assert_eq!(2, reader.position());
        Ok(())
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
        }
    }

    #[test]
    fn test_read_error_requests_shutdown() {
        let shutdown = ShutdownHandle::new();
        assert!(Driver::monitor_io(&shutdown, Broken, io::sink()).is_err());
        assert!(shutdown.is_requested());
    }
}
