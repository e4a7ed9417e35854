//! Command frames for the serial MP3 module.
//!
//! # Wire Format
//! Every command is a fixed 10-byte frame:
//!
//! ```text
//! 7E FF 06 CMD 00 P1 P2 CK_HI CK_LO EF
//! ^^ ^^ ^^ ^^^ ^^ ^^^^^ ^^^^^^^^^^^ ^^
//! |  |  |  |   |  param checksum    end
//! |  |  |  |   no feedback
//! |  |  |  command
//! |  |  length
//! |  version
//! start
//! ```
//!
//! The checksum is the 16-bit two's complement of the sum of bytes 1..=6
//! (version through P2), sent big-endian.

use tracklink_core::{TrackId, constants::MAX_AUDIO_VOLUME};

pub const FRAME_START: u8 = 0x7E;
pub const FRAME_VERSION: u8 = 0xFF;
pub const FRAME_LENGTH: u8 = 0x06;
pub const FRAME_END: u8 = 0xEF;
pub const FRAME_SIZE: usize = 10;

/// Commands understood by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AudioCommand {
    PlayTrack = 0x03,
    SetVolume = 0x06,
}

/// Encode one command frame.
///
/// # Examples
///
/// ```
/// use tracklink_hardware::audio_frame::{AudioCommand, encode};
///
/// let frame = encode(AudioCommand::PlayTrack, 0x0001);
/// assert_eq!(frame, [0x7E, 0xFF, 0x06, 0x03, 0x00, 0x00, 0x01, 0xFE, 0xF7, 0xEF]);
/// ```
pub fn encode(command: AudioCommand, param: u16) -> [u8; FRAME_SIZE] {
    let [p1, p2] = param.to_be_bytes();
    let mut frame = [
        FRAME_START,
        FRAME_VERSION,
        FRAME_LENGTH,
        command as u8,
        0x00,
        p1,
        p2,
        0x00,
        0x00,
        FRAME_END,
    ];

    let [ck_hi, ck_lo] = checksum(&frame[1..7]).to_be_bytes();
    frame[7] = ck_hi;
    frame[8] = ck_lo;
    frame
}

/// Frame that starts playing `track`.
pub fn play_track(track: TrackId) -> [u8; FRAME_SIZE] {
    encode(AudioCommand::PlayTrack, track.number())
}

/// Frame that sets the volume, clamped to the module's 0-30 range.
pub fn set_volume(level: u8) -> [u8; FRAME_SIZE] {
    encode(
        AudioCommand::SetVolume,
        u16::from(level.min(MAX_AUDIO_VOLUME)),
    )
}

fn checksum(bytes: &[u8]) -> u16 {
    let sum = bytes
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)));
    0u16.wrapping_sub(sum)
}
