//! Mock audio module.
//!
//! Records every command instead of playing it, so tests can assert on the
//! exact sequence of tracks a scenario produced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use tracklink_core::{TrackId, constants::MAX_AUDIO_VOLUME};

use crate::{HardwareError, Result, traits::AudioPlayer, types::DeviceInfo};

#[derive(Debug, Default)]
struct AudioState {
    volume: Option<u8>,
    played: Vec<TrackId>,
    fail_commands: bool,
}

fn lock(state: &Mutex<AudioState>) -> MutexGuard<'_, AudioState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock audio player.
///
/// # Examples
///
/// ```
/// use tracklink_core::TrackId;
/// use tracklink_hardware::mock::MockAudioPlayer;
/// use tracklink_hardware::traits::AudioPlayer;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tracklink_hardware::Result<()> {
/// let (mut player, handle) = MockAudioPlayer::new();
///
/// player.set_volume(24).await?;
/// player.play_track(TrackId::new(4)).await?;
///
/// assert_eq!(handle.volume(), Some(24));
/// assert_eq!(handle.played(), vec![TrackId::new(4)]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockAudioPlayer {
    state: Arc<Mutex<AudioState>>,
}

impl MockAudioPlayer {
    pub fn new() -> (Self, MockAudioHandle) {
        let state = Arc::new(Mutex::new(AudioState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockAudioHandle { state },
        )
    }
}

impl AudioPlayer for MockAudioPlayer {
    async fn set_volume(&mut self, level: u8) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_commands {
            return Err(HardwareError::communication("audio module not responding"));
        }

        state.volume = Some(level.min(MAX_AUDIO_VOLUME));
        Ok(())
    }

    async fn play_track(&mut self, track: TrackId) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_commands {
            return Err(HardwareError::communication("audio module not responding"));
        }

        debug!(%track, "Mock audio playing track");
        state.played.push(track);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Mock Audio", "Mock MP3")
    }
}

/// Handle for inspecting a mock audio player.
#[derive(Debug, Clone)]
pub struct MockAudioHandle {
    state: Arc<Mutex<AudioState>>,
}

impl MockAudioHandle {
    /// Tracks played so far, oldest first.
    pub fn played(&self) -> Vec<TrackId> {
        lock(&self.state).played.clone()
    }

    /// How many times `track` was played.
    pub fn play_count(&self, track: TrackId) -> usize {
        lock(&self.state)
            .played
            .iter()
            .filter(|played| **played == track)
            .count()
    }

    /// Last volume set, if any.
    pub fn volume(&self) -> Option<u8> {
        lock(&self.state).volume
    }

    /// Forget recorded tracks.
    pub fn clear(&self) {
        lock(&self.state).played.clear();
    }

    /// Make every subsequent command fail.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).fail_commands = failing;
    }
}
