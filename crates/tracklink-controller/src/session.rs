//! Driver session state machine.
//!
//! This module turns debounced card reads and backend answers into driver
//! sessions with timeouts. It owns no I/O: the caller feeds it events and the
//! current time, performs the authorization exchange it asks for, and plays
//! feedback for the transitions it reports.
//!
//! # States
//!
//! - `Idle`: no driver
//! - `PendingAuth`: a card was presented, waiting for the backend
//! - `Authorized`: the backend accepted the card; valid for the session timeout
//! - `UnauthorizedCooldown`: denied, revoked or the request failed; new
//!   attempts with the same card are ignored until the cooldown elapses
//!
//! # Valid Transitions
//!
//! - Idle → PendingAuth (card presented)
//! - PendingAuth → Authorized / UnauthorizedCooldown
//! - Authorized → Idle (expired) / UnauthorizedCooldown (revoked by server)
//! - UnauthorizedCooldown → Idle (cooldown elapsed)
//! - any non-Idle state → PendingAuth (a different card supersedes the session)
//!
//! `Authorized` is reachable only from `PendingAuth`.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tracklink_core::{CardUid, config::SessionConfig};
//! use tracklink_controller::session::{SessionController, SessionState};
//! use tracklink_network::AuthResponse;
//!
//! let mut sessions = SessionController::new(&SessionConfig::default());
//! let uid = CardUid::new("12AB34CD").unwrap();
//! let t0 = Instant::now();
//!
//! sessions.on_card(uid.clone(), t0);
//! assert_eq!(sessions.state(), SessionState::PendingAuth);
//!
//! let request = sessions.take_auth_request().unwrap();
//! sessions.on_auth_result(&request, Ok(AuthResponse::authorized("s-1", "Ana Kaya")), t0);
//! assert_eq!(sessions.state(), SessionState::Authorized);
//! assert_eq!(sessions.session().driver_name.as_deref(), Some("Ana Kaya"));
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use tracklink_core::{CardUid, Error, Result, config::SessionConfig};
use tracklink_network::AuthResponse;

/// Maximum number of transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 100;

/// State of the driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No driver.
    Idle,

    /// Waiting for the backend to authorize the presented card.
    PendingAuth,

    /// Driver authorized.
    Authorized,

    /// Denied, revoked or failed; waiting for the cooldown to elapse.
    UnauthorizedCooldown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Idle => "Idle",
            SessionState::PendingAuth => "PendingAuth",
            SessionState::Authorized => "Authorized",
            SessionState::UnauthorizedCooldown => "UnauthorizedCooldown",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracklink_controller::session::SessionState;
    ///
    /// assert!(SessionState::Idle.can_transition_to(&SessionState::PendingAuth));
    /// assert!(!SessionState::Idle.can_transition_to(&SessionState::Authorized));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // Any state: a card starts or restarts authorization
            (_, SessionState::PendingAuth)
            // From PendingAuth
            | (SessionState::PendingAuth, SessionState::Authorized | SessionState::UnauthorizedCooldown)
            // From Authorized
            | (SessionState::Authorized, SessionState::Idle | SessionState::UnauthorizedCooldown)
            // From UnauthorizedCooldown
            | (SessionState::UnauthorizedCooldown, SessionState::Idle)
        )
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A card was presented while idle.
    CardPresented,

    /// A different card replaced the current session.
    Superseded,

    /// The backend authorized the card.
    Authorized,

    /// The backend denied the card.
    Denied,

    /// The authorization exchange failed or carried no decision.
    RequestFailed,

    /// No answer arrived within the authorization response timeout.
    ResponseTimeout,

    /// A telemetry answer withdrew the authorization.
    Revoked,

    /// The session outlived the session timeout.
    SessionExpired,

    /// The cooldown deadline passed.
    CooldownElapsed,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub cause: TransitionCause,
    pub at: Instant,
}

/// The one driver session.
///
/// Reset to empty on expiry and replaced when a different card is
/// presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub card_uid: Option<CardUid>,
    pub session_id: Option<String>,
    pub driver_name: Option<String>,
    pub authorized_at: Option<Instant>,

    /// When the current state was entered.
    pub entered_at: Instant,

    /// End of the cooldown while in `UnauthorizedCooldown`.
    pub cooldown_until: Option<Instant>,
}

impl Session {
    fn empty(now: Instant) -> Self {
        Self {
            state: SessionState::Idle,
            card_uid: None,
            session_id: None,
            driver_name: None,
            authorized_at: None,
            entered_at: now,
            cooldown_until: None,
        }
    }

    fn pending(uid: CardUid, now: Instant) -> Self {
        Self {
            state: SessionState::PendingAuth,
            card_uid: Some(uid),
            ..Self::empty(now)
        }
    }
}

/// Session timing, taken from [`SessionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub session: Duration,
    pub unauthorized_cooldown: Duration,
    pub failure_cooldown: Duration,
    pub auth_response: Duration,
}

impl From<&SessionConfig> for SessionTimeouts {
    fn from(config: &SessionConfig) -> Self {
        Self {
            session: config.session_timeout(),
            unauthorized_cooldown: config.unauthorized_cooldown(),
            failure_cooldown: config.failure_cooldown(),
            auth_response: config.auth_response_timeout(),
        }
    }
}

/// Authentication state machine.
#[derive(Debug)]
pub struct SessionController {
    session: Session,
    timeouts: SessionTimeouts,

    /// Whether the authorization request for the pending card was handed out.
    request_issued: bool,

    history: VecDeque<SessionTransition>,
}

impl SessionController {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_timeouts(SessionTimeouts::from(config))
    }

    pub fn with_timeouts(timeouts: SessionTimeouts) -> Self {
        Self {
            session: Session::empty(Instant::now()),
            timeouts,
            request_issued: false,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timeouts(&self) -> &SessionTimeouts {
        &self.timeouts
    }

    /// Card of the session while `Authorized`.
    pub fn active_card(&self) -> Option<&CardUid> {
        match self.session.state {
            SessionState::Authorized => self.session.card_uid.as_ref(),
            _ => None,
        }
    }

    /// Oldest-first history of recent transitions.
    pub fn history(&self) -> &VecDeque<SessionTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<SessionTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Time left in the cooldown, if cooling down.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        match self.session.state {
            SessionState::UnauthorizedCooldown => self
                .session
                .cooldown_until
                .map(|until| until.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Handle a debounced card read.
    ///
    /// Returns the transition it caused, if any. The same card presented
    /// again while a session for it exists is a no-op.
    pub fn on_card(&mut self, uid: CardUid, now: Instant) -> Option<SessionTransition> {
        match self.session.state {
            SessionState::Idle => {
                info!(card = %uid, "Card presented, requesting authorization");
                self.begin_pending(uid, TransitionCause::CardPresented, now)
            }
            _ if self.session.card_uid.as_ref() == Some(&uid) => {
                debug!(card = %uid, state = %self.session.state, "Same card re-presented, ignoring");
                None
            }
            state => {
                info!(
                    card = %uid,
                    previous = ?self.session.card_uid.as_ref().map(CardUid::as_str),
                    %state,
                    "Different card presented, superseding session"
                );
                self.begin_pending(uid, TransitionCause::Superseded, now)
            }
        }
    }

    /// Hand out the pending authorization request, once.
    ///
    /// The caller sends it when the link allows; until then the request
    /// stays pending and the response timeout keeps running.
    pub fn take_auth_request(&mut self) -> Option<CardUid> {
        if self.session.state != SessionState::PendingAuth || self.request_issued {
            return None;
        }

        self.request_issued = true;
        self.session.card_uid.clone()
    }

    /// Handle the outcome of the authorization exchange for `uid`.
    ///
    /// Outcomes for a card that is no longer pending are ignored.
    pub fn on_auth_result(
        &mut self,
        uid: &CardUid,
        result: Result<AuthResponse>,
        now: Instant,
    ) -> Option<SessionTransition> {
        if self.session.state != SessionState::PendingAuth
            || self.session.card_uid.as_ref() != Some(uid)
        {
            debug!(card = %uid, state = %self.session.state, "Ignoring stale authorization result");
            return None;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_request_failure() {
                    warn!(card = %uid, error = %e, "Authorization request failed");
                } else {
                    error!(card = %uid, error = %e, "Authorization request could not be sent");
                }
                return self.enter_cooldown(
                    self.timeouts.failure_cooldown,
                    TransitionCause::RequestFailed,
                    now,
                );
            }
        };

        let Some(authorization) = response.authorization else {
            warn!(card = %uid, message = %response.message, "Authorization response carried no decision");
            return self.enter_cooldown(
                self.timeouts.failure_cooldown,
                TransitionCause::RequestFailed,
                now,
            );
        };

        if authorization.authorized {
            info!(
                card = %uid,
                session_id = %authorization.session_id,
                driver = authorization.driver_name.as_deref().unwrap_or("<unknown>"),
                "Driver authorized"
            );
            let transition =
                accepted(self.transition(SessionState::Authorized, TransitionCause::Authorized, now))?;
            self.session.session_id = Some(authorization.session_id);
            self.session.driver_name = authorization.driver_name;
            self.session.authorized_at = Some(now);
            Some(transition)
        } else {
            info!(card = %uid, message = %response.message, "Driver denied");
            self.enter_cooldown(
                self.timeouts.unauthorized_cooldown,
                TransitionCause::Denied,
                now,
            )
        }
    }

    /// Re-sync with the authorization carried by a telemetry answer.
    ///
    /// `uid` is the card the telemetry request carried. Only an answer about
    /// the active authorized card with a decision block has an effect.
    pub fn on_telemetry_response(
        &mut self,
        uid: &CardUid,
        response: &AuthResponse,
        now: Instant,
    ) -> Option<SessionTransition> {
        if self.active_card() != Some(uid) {
            return None;
        }
        let authorization = response.authorization.as_ref()?;

        if !authorization.authorized {
            warn!(card = %uid, message = %response.message, "Server revoked authorization");
            return self.enter_cooldown(
                self.timeouts.unauthorized_cooldown,
                TransitionCause::Revoked,
                now,
            );
        }

        let session_changed =
            self.session.session_id.as_deref() != Some(authorization.session_id.as_str());
        let driver_changed = authorization.driver_name.is_some()
            && authorization.driver_name != self.session.driver_name;

        if session_changed || driver_changed {
            info!(
                card = %uid,
                session_id = %authorization.session_id,
                driver = ?authorization.driver_name,
                "Session identity updated by server"
            );
            self.session.session_id = Some(authorization.session_id.clone());
            if driver_changed {
                self.session.driver_name = authorization.driver_name.clone();
            }
        }

        None
    }

    /// Run the timeout checks.
    pub fn tick(&mut self, now: Instant) -> Option<SessionTransition> {
        match self.session.state {
            SessionState::Idle => None,
            SessionState::PendingAuth => {
                let waited = now.saturating_duration_since(self.session.entered_at);
                if waited < self.timeouts.auth_response {
                    return None;
                }
                warn!(
                    card = ?self.session.card_uid.as_ref().map(CardUid::as_str),
                    waited_ms = waited.as_millis() as u64,
                    "No authorization response in time"
                );
                self.enter_cooldown(
                    self.timeouts.failure_cooldown,
                    TransitionCause::ResponseTimeout,
                    now,
                )
            }
            SessionState::Authorized => {
                let authorized_at = self.session.authorized_at?;
                if now.saturating_duration_since(authorized_at) < self.timeouts.session {
                    return None;
                }
                info!(
                    card = ?self.session.card_uid.as_ref().map(CardUid::as_str),
                    "Session expired"
                );
                self.reset(TransitionCause::SessionExpired, now)
            }
            SessionState::UnauthorizedCooldown => {
                let until = self.session.cooldown_until?;
                if now < until {
                    return None;
                }
                debug!("Cooldown elapsed");
                self.reset(TransitionCause::CooldownElapsed, now)
            }
        }
    }

    fn begin_pending(
        &mut self,
        uid: CardUid,
        cause: TransitionCause,
        now: Instant,
    ) -> Option<SessionTransition> {
        let from = self.session.state;
        self.session = Session::pending(uid, now);
        self.request_issued = false;
        Some(self.record(from, SessionState::PendingAuth, cause, now))
    }

    fn enter_cooldown(
        &mut self,
        cooldown: Duration,
        cause: TransitionCause,
        now: Instant,
    ) -> Option<SessionTransition> {
        let transition =
            accepted(self.transition(SessionState::UnauthorizedCooldown, cause, now))?;
        self.session.cooldown_until = Some(now + cooldown);
        self.session.session_id = None;
        self.session.driver_name = None;
        self.session.authorized_at = None;
        Some(transition)
    }

    fn reset(&mut self, cause: TransitionCause, now: Instant) -> Option<SessionTransition> {
        let from = self.session.state;
        self.session = Session::empty(now);
        self.request_issued = false;
        Some(self.record(from, SessionState::Idle, cause, now))
    }

    /// Move to `to`, validating the transition first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] and leaves the session
    /// untouched if `to` is not reachable from the current state.
    fn transition(
        &mut self,
        to: SessionState,
        cause: TransitionCause,
        now: Instant,
    ) -> Result<SessionTransition> {
        let from = self.session.state;
        if !from.can_transition_to(&to) {
            return Err(Error::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.session.state = to;
        self.session.entered_at = now;
        Ok(self.record(from, to, cause, now))
    }

    fn record(
        &mut self,
        from: SessionState,
        to: SessionState,
        cause: TransitionCause,
        at: Instant,
    ) -> SessionTransition {
        let transition = SessionTransition { from, to, cause, at };
        debug!(%from, %to, %cause, "Session transition");

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        transition
    }
}

fn accepted(result: Result<SessionTransition>) -> Option<SessionTransition> {
    result
        .inspect_err(|e| error!(error = %e, "Rejected session transition"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SESSION: Duration = Duration::from_secs(12 * 60 * 60);
    const UNAUTH: Duration = Duration::from_secs(6 * 60 * 60);
    const FAILURE: Duration = Duration::from_secs(5);
    const RESPONSE: Duration = Duration::from_secs(15);

    fn controller() -> SessionController {
        SessionController::new(&SessionConfig::default())
    }

    fn uid(s: &str) -> CardUid {
        CardUid::new(s).unwrap()
    }

    fn authorize(sessions: &mut SessionController, card: &str, now: Instant) {
        sessions.on_card(uid(card), now);
        let request = sessions.take_auth_request().unwrap();
        sessions.on_auth_result(&request, Ok(AuthResponse::authorized("s-1", "Ana Kaya")), now);
        assert_eq!(sessions.state(), SessionState::Authorized);
    }

    #[rstest]
    #[case(SessionState::Idle, SessionState::PendingAuth, true)]
    #[case(SessionState::Idle, SessionState::Authorized, false)]
    #[case(SessionState::Idle, SessionState::UnauthorizedCooldown, false)]
    #[case(SessionState::PendingAuth, SessionState::Authorized, true)]
    #[case(SessionState::PendingAuth, SessionState::UnauthorizedCooldown, true)]
    #[case(SessionState::PendingAuth, SessionState::Idle, false)]
    #[case(SessionState::Authorized, SessionState::Idle, true)]
    #[case(SessionState::Authorized, SessionState::PendingAuth, true)]
    #[case(SessionState::UnauthorizedCooldown, SessionState::Authorized, false)]
    #[case(SessionState::UnauthorizedCooldown, SessionState::Idle, true)]
    fn test_transition_table(
        #[case] from: SessionState,
        #[case] to: SessionState,
        #[case] valid: bool,
    ) {
        assert_eq!(from.can_transition_to(&to), valid);
    }

    #[test]
    fn test_default_timeouts() {
        let sessions = controller();
        assert_eq!(
            *sessions.timeouts(),
            SessionTimeouts {
                session: SESSION,
                unauthorized_cooldown: UNAUTH,
                failure_cooldown: FAILURE,
                auth_response: RESPONSE,
            }
        );
    }

    #[test]
    fn test_card_while_idle_starts_authorization() {
        let mut sessions = controller();
        let t0 = Instant::now();

        let transition = sessions.on_card(uid("12AB34CD"), t0).unwrap();
        assert_eq!(transition.from, SessionState::Idle);
        assert_eq!(transition.to, SessionState::PendingAuth);
        assert_eq!(transition.cause, TransitionCause::CardPresented);

        assert_eq!(sessions.take_auth_request(), Some(uid("12AB34CD")));
        assert_eq!(sessions.take_auth_request(), None);
    }

    #[test]
    fn test_authorized_response() {
        let mut sessions = controller();
        let t0 = Instant::now();
        authorize(&mut sessions, "12AB34CD", t0);

        let session = sessions.session();
        assert_eq!(session.session_id.as_deref(), Some("s-1"));
        assert_eq!(session.driver_name.as_deref(), Some("Ana Kaya"));
        assert_eq!(session.authorized_at, Some(t0));
        assert_eq!(sessions.active_card(), Some(&uid("12AB34CD")));
    }

    #[test]
    fn test_denied_response_sets_long_cooldown() {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);

        let transition = sessions
            .on_auth_result(&uid("12AB34CD"), Ok(AuthResponse::denied()), t0)
            .unwrap();

        assert_eq!(transition.to, SessionState::UnauthorizedCooldown);
        assert_eq!(transition.cause, TransitionCause::Denied);
        assert_eq!(sessions.session().cooldown_until, Some(t0 + UNAUTH));
    }

    #[rstest]
    #[case(Err(Error::TransportFailure("connection refused".into())))]
    #[case(Err(Error::DecodeFailure("expected value".into())))]
    #[case(Err(Error::Config("invalid server URL".into())))]
    #[case(Ok(AuthResponse::acknowledged("no data")))]
    fn test_request_failure_sets_short_cooldown(#[case] result: Result<AuthResponse>) {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);

        let transition = sessions.on_auth_result(&uid("12AB34CD"), result, t0).unwrap();

        assert_eq!(transition.cause, TransitionCause::RequestFailed);
        assert_eq!(sessions.session().cooldown_until, Some(t0 + FAILURE));
        assert_eq!(sessions.cooldown_remaining(t0), Some(FAILURE));
    }

    #[test]
    fn test_same_card_is_noop_in_every_state() {
        let mut sessions = controller();
        let t0 = Instant::now();

        sessions.on_card(uid("12AB34CD"), t0);
        assert!(sessions.on_card(uid("12AB34CD"), t0).is_none());

        sessions.on_auth_result(&uid("12AB34CD"), Ok(AuthResponse::denied()), t0);
        assert!(sessions.on_card(uid("12AB34CD"), t0).is_none());
        assert_eq!(sessions.state(), SessionState::UnauthorizedCooldown);

        let mut sessions = controller();
        authorize(&mut sessions, "12AB34CD", t0);
        assert!(sessions.on_card(uid("12AB34CD"), t0).is_none());
        assert_eq!(sessions.history().len(), 2);
    }

    #[rstest]
    #[case::pending(false, false)]
    #[case::authorized(true, true)]
    #[case::cooldown(true, false)]
    fn test_different_card_supersedes(#[case] answer: bool, #[case] authorized: bool) {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);
        sessions.take_auth_request();

        if answer {
            let response = if authorized {
                AuthResponse::authorized("s-1", "Ana Kaya")
            } else {
                AuthResponse::denied()
            };
            sessions.on_auth_result(&uid("12AB34CD"), Ok(response), t0);
        }

        let transition = sessions.on_card(uid("DEADBEEF"), t0).unwrap();
        assert_eq!(transition.to, SessionState::PendingAuth);
        assert_eq!(transition.cause, TransitionCause::Superseded);

        let session = sessions.session();
        assert_eq!(session.card_uid, Some(uid("DEADBEEF")));
        assert_eq!(session.session_id, None);
        assert_eq!(session.driver_name, None);
        assert_eq!(session.cooldown_until, None);
        assert_eq!(sessions.take_auth_request(), Some(uid("DEADBEEF")));
    }

    #[test]
    fn test_response_for_superseded_card_is_ignored() {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);
        sessions.on_card(uid("DEADBEEF"), t0);

        let stale = sessions.on_auth_result(
            &uid("12AB34CD"),
            Ok(AuthResponse::authorized("s-1", "Ana Kaya")),
            t0,
        );

        assert!(stale.is_none());
        assert_eq!(sessions.state(), SessionState::PendingAuth);
        assert_eq!(sessions.session().card_uid, Some(uid("DEADBEEF")));
    }

    #[test]
    fn test_expiry_is_exact() {
        let mut sessions = controller();
        let t0 = Instant::now();
        authorize(&mut sessions, "12AB34CD", t0);

        assert!(sessions.tick(t0 + SESSION - Duration::from_millis(1)).is_none());
        assert_eq!(sessions.state(), SessionState::Authorized);

        let transition = sessions.tick(t0 + SESSION).unwrap();
        assert_eq!(transition.to, SessionState::Idle);
        assert_eq!(transition.cause, TransitionCause::SessionExpired);
        assert_eq!(sessions.session().card_uid, None);
    }

    #[test]
    fn test_cooldown_elapses_to_idle() {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);
        sessions.on_auth_result(&uid("12AB34CD"), Ok(AuthResponse::denied()), t0);

        assert!(sessions.tick(t0 + UNAUTH - Duration::from_millis(1)).is_none());

        let transition = sessions.tick(t0 + UNAUTH).unwrap();
        assert_eq!(transition.from, SessionState::UnauthorizedCooldown);
        assert_eq!(transition.cause, TransitionCause::CooldownElapsed);

        // The same card can authorize again.
        assert!(sessions.on_card(uid("12AB34CD"), t0 + UNAUTH).is_some());
    }

    #[test]
    fn test_pending_without_response_times_out() {
        let mut sessions = controller();
        let t0 = Instant::now();
        sessions.on_card(uid("12AB34CD"), t0);

        assert!(sessions.tick(t0 + RESPONSE - Duration::from_millis(1)).is_none());

        let transition = sessions.tick(t0 + RESPONSE).unwrap();
        assert_eq!(transition.cause, TransitionCause::ResponseTimeout);
        assert_eq!(
            sessions.session().cooldown_until,
            Some(t0 + RESPONSE + FAILURE)
        );
    }

    #[test]
    fn test_telemetry_revocation() {
        let mut sessions = controller();
        let t0 = Instant::now();
        authorize(&mut sessions, "12AB34CD", t0);

        let later = t0 + Duration::from_secs(60);
        let transition = sessions
            .on_telemetry_response(&uid("12AB34CD"), &AuthResponse::denied(), later)
            .unwrap();

        assert_eq!(transition.to, SessionState::UnauthorizedCooldown);
        assert_eq!(transition.cause, TransitionCause::Revoked);
        assert_eq!(sessions.session().cooldown_until, Some(later + UNAUTH));
    }

    #[test]
    fn test_telemetry_identity_update_keeps_expiry() {
        let mut sessions = controller();
        let t0 = Instant::now();
        authorize(&mut sessions, "12AB34CD", t0);

        let later = t0 + Duration::from_secs(60);
        let transition = sessions.on_telemetry_response(
            &uid("12AB34CD"),
            &AuthResponse::authorized("s-2", "Ana Kaya Yilmaz"),
            later,
        );

        assert!(transition.is_none());
        let session = sessions.session();
        assert_eq!(session.session_id.as_deref(), Some("s-2"));
        assert_eq!(session.driver_name.as_deref(), Some("Ana Kaya Yilmaz"));
        assert_eq!(session.authorized_at, Some(t0));
    }

    #[test]
    fn test_telemetry_without_correction() {
        let mut sessions = controller();
        let t0 = Instant::now();
        authorize(&mut sessions, "12AB34CD", t0);

        // No data block.
        assert!(
            sessions
                .on_telemetry_response(&uid("12AB34CD"), &AuthResponse::acknowledged("ok"), t0)
                .is_none()
        );
        // Answer about a card that is not the active one.
        assert!(
            sessions
                .on_telemetry_response(&uid("DEADBEEF"), &AuthResponse::denied(), t0)
                .is_none()
        );
        assert_eq!(sessions.state(), SessionState::Authorized);
    }

    #[test]
    fn test_authorized_only_through_pending() {
        let mut sessions = controller();
        let t0 = Instant::now();

        // An answer while idle must not authorize.
        assert!(
            sessions
                .on_auth_result(
                    &uid("12AB34CD"),
                    Ok(AuthResponse::authorized("s-1", "Ana Kaya")),
                    t0
                )
                .is_none()
        );
        assert_eq!(sessions.state(), SessionState::Idle);

        authorize(&mut sessions, "12AB34CD", t0);
        for transition in sessions.history() {
            if transition.to == SessionState::Authorized {
                assert_eq!(transition.from, SessionState::PendingAuth);
            }
        }
    }

    #[test]
    fn test_invalid_transition_is_an_error() {
        let mut sessions = controller();
        let t0 = Instant::now();

        let result = sessions.transition(SessionState::Authorized, TransitionCause::Authorized, t0);

        match result {
            Err(Error::InvalidStateTransition { from, to }) => {
                assert_eq!(from, "Idle");
                assert_eq!(to, "Authorized");
            }
            other => panic!("expected InvalidStateTransition, got {other:?}"),
        }
        assert_eq!(sessions.state(), SessionState::Idle);
        assert!(sessions.history().is_empty());
    }

    #[test]
    fn test_rejected_cooldown_leaves_session_untouched() {
        let mut sessions = controller();
        let t0 = Instant::now();

        let transition = sessions.enter_cooldown(UNAUTH, TransitionCause::Denied, t0);

        assert!(transition.is_none());
        assert_eq!(sessions.state(), SessionState::Idle);
        assert_eq!(sessions.session().cooldown_until, None);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut sessions = controller();
        let t0 = Instant::now();

        for i in 0..(MAX_HISTORY_SIZE as u32 + 20) {
            sessions.on_card(CardUid::from_bytes(&i.to_be_bytes()).unwrap(), t0);
        }

        assert_eq!(sessions.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(sessions.last_transitions(3).len(), 3);
        assert_eq!(
            sessions.last_transitions(1)[0].cause,
            TransitionCause::Superseded
        );
    }
}
