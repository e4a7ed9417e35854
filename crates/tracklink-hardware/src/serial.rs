//! Serial-attached peripherals.
//!
//! Two devices hang off UARTs on the bench rig:
//!
//! - a card reader bridge that prints one hexadecimal UID per line
//!   (`12AB34CD\r\n`) each time a card enters the field;
//! - the MP3 module, driven with the frames from
//!   [`audio_frame`](crate::audio_frame).
//!
//! Ports are opened in `begin()`/`open()` and read without blocking: the
//! reader drains whatever bytes are pending and keeps partial lines for the
//! next poll.

use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, info, warn};
use tracklink_core::{CardUid, TrackId};

use crate::{
    HardwareError, Result, audio_frame,
    debounce::UidDebouncer,
    traits::{AudioPlayer, CardReader},
    types::DeviceInfo,
};

/// Baud rate of the card reader bridge.
pub const CARD_READER_BAUD: u32 = 115_200;

/// Baud rate of the MP3 module.
pub const AUDIO_BAUD: u32 = 9_600;

/// Per-call I/O timeout; reads only consume bytes already pending.
const PORT_TIMEOUT: Duration = Duration::from_millis(20);

/// Longest line accepted from the reader bridge before it is discarded.
const MAX_LINE_LENGTH: usize = 64;

type Port = Mutex<Box<dyn SerialPort>>;

fn lock(port: &Port) -> MutexGuard<'_, Box<dyn SerialPort>> {
    port.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    serialport::new(path, baud)
        .timeout(PORT_TIMEOUT)
        .open()
        .map_err(|e| HardwareError::initialization_failed(format!("{path}: {e}")))
}

/// Card reader bridge on a serial port.
pub struct SerialCardReader {
    path: String,
    baud: u32,
    port: Option<Port>,
    line: Vec<u8>,
    debouncer: UidDebouncer,
}

impl SerialCardReader {
    pub fn new(path: impl Into<String>, debounce_window: Duration) -> Self {
        Self {
            path: path.into(),
            baud: CARD_READER_BAUD,
            port: None,
            line: Vec::with_capacity(MAX_LINE_LENGTH),
            debouncer: UidDebouncer::new(debounce_window),
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    /// Feed raw bytes and return the UID of the last complete line, if any.
    fn consume(&mut self, bytes: &[u8]) -> Option<CardUid> {
        let mut latest = None;

        for &byte in bytes {
            match byte {
                b'\r' | b'\n' => {
                    if self.line.is_empty() {
                        continue;
                    }
                    let text = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();

                    match CardUid::new(&text) {
                        Ok(uid) => latest = Some(uid),
                        Err(e) => warn!(line = %text, error = %e, "Ignoring malformed reader line"),
                    }
                }
                _ if self.line.len() >= MAX_LINE_LENGTH => {
                    warn!(port = %self.path, "Reader line too long, discarding");
                    self.line.clear();
                }
                _ => self.line.push(byte),
            }
        }

        latest
    }
}

impl std::fmt::Debug for SerialCardReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialCardReader")
            .field("path", &self.path)
            .field("baud", &self.baud)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl CardReader for SerialCardReader {
    async fn begin(&mut self) -> Result<()> {
        let port = open_port(&self.path, self.baud)?;
        info!(port = %self.path, baud = self.baud, "Card reader bridge opened");
        self.port = Some(Mutex::new(port));
        Ok(())
    }

    async fn poll_card(&mut self, now: Instant) -> Result<Option<CardUid>> {
        let Some(port) = &self.port else {
            return Err(HardwareError::not_initialized(&self.path));
        };

        let mut buf = [0u8; 128];
        let read = {
            let mut port = lock(port);
            let pending = port
                .bytes_to_read()
                .map_err(|e| HardwareError::card_read(e.to_string()))?;
            if pending == 0 {
                return Ok(None);
            }
            port.read(&mut buf)?
        };

        Ok(self
            .consume(&buf[..read])
            .and_then(|uid| self.debouncer.accept(uid, now)))
    }

    fn is_healthy(&self) -> bool {
        self.port.is_some()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.path.clone(), "Serial card reader bridge")
    }
}

/// MP3 module on a serial port.
pub struct SerialAudioPlayer {
    path: String,
    port: Port,
}

impl SerialAudioPlayer {
    /// Open the module's port.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InitializationFailed`] if the port cannot be
    /// opened.
    pub fn open(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let port = open_port(&path, AUDIO_BAUD)?;
        info!(port = %path, "Audio module opened");
        Ok(Self {
            path,
            port: Mutex::new(port),
        })
    }

    fn send(&self, frame: &[u8]) -> Result<()> {
        let mut port = lock(&self.port);
        port.write_all(frame)?;
        port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialAudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialAudioPlayer")
            .field("path", &self.path)
            .finish()
    }
}

impl AudioPlayer for SerialAudioPlayer {
    async fn set_volume(&mut self, level: u8) -> Result<()> {
        debug!(level, "Setting audio volume");
        self.send(&audio_frame::set_volume(level))
    }

    async fn play_track(&mut self, track: TrackId) -> Result<()> {
        debug!(%track, "Playing track");
        self.send(&audio_frame::play_track(track))
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.path.clone(), "Serial MP3 module")
    }
}
