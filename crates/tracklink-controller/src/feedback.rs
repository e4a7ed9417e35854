//! Audio feedback for session and link events.
//!
//! Each session transition maps to at most one track. Playback is
//! fire-and-forget: a failing audio module is logged and otherwise ignored,
//! the control loop never waits on it.

use tracing::{debug, info, warn};
use tracklink_core::{
    TrackId,
    config::{AudioConfig, TrackSet},
    constants::MAX_AUDIO_VOLUME,
};
use tracklink_hardware::AudioPlayer;

use crate::connectivity::ConnectionEvent;
use crate::session::{SessionState, SessionTransition, TransitionCause};

/// Track announcing `transition`, if any.
///
/// Expiry and cooldown elapse return to `Idle` silently.
pub fn track_for_transition(tracks: &TrackSet, transition: &SessionTransition) -> Option<TrackId> {
    match (transition.to, transition.cause) {
        (SessionState::PendingAuth, _) => Some(tracks.entry),
        (SessionState::Authorized, _) => Some(tracks.authorized),
        (
            SessionState::UnauthorizedCooldown,
            TransitionCause::RequestFailed | TransitionCause::ResponseTimeout,
        ) => Some(tracks.error),
        (SessionState::UnauthorizedCooldown, _) => Some(tracks.unauthorized),
        (SessionState::Idle, _) => None,
    }
}

/// Track announcing a connectivity event, if any.
pub fn track_for_connection(tracks: &TrackSet, event: &ConnectionEvent) -> Option<TrackId> {
    match event {
        ConnectionEvent::ConnectFailed { .. } => Some(tracks.link_failure),
        _ => None,
    }
}

/// Plays feedback tracks on the audio module.
#[derive(Debug)]
pub struct FeedbackDispatcher<A> {
    player: A,
    tracks: TrackSet,
    volume: u8,
    failures: u64,
}

impl<A: AudioPlayer> FeedbackDispatcher<A> {
    pub fn new(player: A, config: &AudioConfig) -> Self {
        Self {
            player,
            tracks: config.tracks,
            volume: config.volume.min(MAX_AUDIO_VOLUME),
            failures: 0,
        }
    }

    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    pub fn player(&self) -> &A {
        &self.player
    }

    /// Audio commands that failed so far.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    /// Log the module and set the startup volume.
    pub async fn begin(&mut self) {
        let info = self.player.info();
        info!(name = %info.name, model = %info.model, volume = self.volume, "Audio module ready");

        if let Err(e) = self.player.set_volume(self.volume).await {
            self.failures += 1;
            warn!(error = %e, volume = self.volume, "Failed to set audio volume");
        }
    }

    pub async fn on_transition(&mut self, transition: &SessionTransition) {
        match track_for_transition(&self.tracks, transition) {
            Some(track) => self.play(track, "session").await,
            None => debug!(to = %transition.to, cause = %transition.cause, "Silent transition"),
        }
    }

    pub async fn on_connection_event(&mut self, event: &ConnectionEvent) {
        if let Some(track) = track_for_connection(&self.tracks, event) {
            self.play(track, "link").await;
        }
    }

    async fn play(&mut self, track: TrackId, source: &'static str) {
        debug!(%track, source, "Playing feedback");
        if let Err(e) = self.player.play_track(track).await {
            self.failures += 1;
            warn!(error = %e, %track, source, "Failed to play feedback track");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Instant;
    use tracklink_hardware::mock::MockAudioPlayer;

    fn transition(from: SessionState, to: SessionState, cause: TransitionCause) -> SessionTransition {
        SessionTransition {
            from,
            to,
            cause,
            at: Instant::now(),
        }
    }

    #[rstest]
    #[case(SessionState::Idle, SessionState::PendingAuth, TransitionCause::CardPresented, Some(1))]
    #[case(SessionState::Authorized, SessionState::PendingAuth, TransitionCause::Superseded, Some(1))]
    #[case(SessionState::PendingAuth, SessionState::Authorized, TransitionCause::Authorized, Some(4))]
    #[case(SessionState::PendingAuth, SessionState::UnauthorizedCooldown, TransitionCause::Denied, Some(2))]
    #[case(SessionState::Authorized, SessionState::UnauthorizedCooldown, TransitionCause::Revoked, Some(2))]
    #[case(SessionState::PendingAuth, SessionState::UnauthorizedCooldown, TransitionCause::RequestFailed, Some(3))]
    #[case(SessionState::PendingAuth, SessionState::UnauthorizedCooldown, TransitionCause::ResponseTimeout, Some(3))]
    #[case(SessionState::Authorized, SessionState::Idle, TransitionCause::SessionExpired, None)]
    #[case(SessionState::UnauthorizedCooldown, SessionState::Idle, TransitionCause::CooldownElapsed, None)]
    fn test_track_mapping(
        #[case] from: SessionState,
        #[case] to: SessionState,
        #[case] cause: TransitionCause,
        #[case] expected: Option<u16>,
    ) {
        let track = track_for_transition(&TrackSet::default(), &transition(from, to, cause));
        assert_eq!(track.map(TrackId::number), expected);
    }

    #[test]
    fn test_only_exhaustion_has_link_track() {
        let tracks = TrackSet::default();
        assert_eq!(
            track_for_connection(&tracks, &ConnectionEvent::ConnectFailed { attempts: 5 }),
            Some(tracks.link_failure)
        );
        assert_eq!(track_for_connection(&tracks, &ConnectionEvent::LinkLost), None);
        assert_eq!(
            track_for_connection(
                &tracks,
                &ConnectionEvent::AttemptFailed {
                    attempt: 0,
                    retry_in: None
                }
            ),
            None
        );
    }

    #[tokio::test]
    async fn test_begin_sets_volume() {
        let (player, handle) = MockAudioPlayer::new();
        let mut feedback = FeedbackDispatcher::new(
            player,
            &AudioConfig {
                volume: 18,
                ..AudioConfig::default()
            },
        );

        feedback.begin().await;
        assert_eq!(handle.volume(), Some(18));
    }

    #[tokio::test]
    async fn test_one_command_per_transition() {
        let (player, handle) = MockAudioPlayer::new();
        let mut feedback = FeedbackDispatcher::new(player, &AudioConfig::default());

        feedback
            .on_transition(&transition(
                SessionState::PendingAuth,
                SessionState::Authorized,
                TransitionCause::Authorized,
            ))
            .await;
        feedback
            .on_transition(&transition(
                SessionState::Authorized,
                SessionState::Idle,
                TransitionCause::SessionExpired,
            ))
            .await;

        assert_eq!(handle.played(), vec![TrackId::new(4)]);
    }

    #[tokio::test]
    async fn test_audio_errors_are_swallowed() {
        let (player, handle) = MockAudioPlayer::new();
        handle.set_failing(true);
        let mut feedback = FeedbackDispatcher::new(player, &AudioConfig::default());

        feedback.begin().await;
        feedback
            .on_connection_event(&ConnectionEvent::ConnectFailed { attempts: 1 })
            .await;

        assert_eq!(feedback.failure_count(), 2);
        assert!(handle.played().is_empty());
    }
}
