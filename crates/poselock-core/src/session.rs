//! Explicit session state.
//!
//! One [`SessionState`] value owns everything a kiosk session mutates:
//! the screen phase, the sample buffer, the gesture gate, and the two
//! presentation flags (password visibility, error indicator). It is
//! passed by reference to the components that need it instead of living
//! in ambient globals, and all mutation happens on the single
//! event-processing thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::SampleBuffer;
use crate::gesture::{GestureGate, GestureOutcome};
use crate::password::{AuthDecision, PasswordGate};

/// Opaque session identifier.
///
/// Format: `S-{uuid}`. Carries no user data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a new random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("S-{}", Uuid::new_v4()))
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which screen the kiosk is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenPhase {
    /// Lock screen; waiting for the unlock swipe.
    Locked,
    /// Camera view with countdown and password entry.
    Active,
    /// Authorized home screen.
    Home,
}

/// Visibility snapshot handed to the display port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState {
    /// Lock screen visibility.
    pub lock_view: bool,
    /// Camera/password view visibility.
    pub active_view: bool,
    /// Home screen visibility.
    pub home_view: bool,
    /// Password entry field visibility.
    pub password_field: bool,
    /// Whether the password field renders its content in the clear.
    pub password_revealed: bool,
    /// Wrong-password indicator visibility.
    pub error_indicator: bool,
}

/// All mutable state of one kiosk session.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    phase: ScreenPhase,
    buffer: SampleBuffer,
    gesture: GestureGate,
    password_revealed: bool,
    error_indicator: bool,
    started_at: DateTime<Utc>,
}

impl SessionState {
    /// Creates a fresh locked session.
    #[must_use]
    pub fn new(max_buffer_len: usize) -> Self {
        Self {
            id: SessionId::generate(),
            phase: ScreenPhase::Locked,
            buffer: SampleBuffer::new(max_buffer_len),
            gesture: GestureGate::new(),
            password_revealed: false,
            error_indicator: false,
            started_at: Utc::now(),
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current screen phase.
    #[must_use]
    pub const fn phase(&self) -> ScreenPhase {
        self.phase
    }

    /// The sample buffer.
    #[must_use]
    pub const fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Mutable access to the sample buffer (capture appends,
    /// delete-last).
    pub const fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    /// Whether the error indicator is currently raised.
    #[must_use]
    pub const fn error_indicator(&self) -> bool {
        self.error_indicator
    }

    /// Whether the password field renders its content in the clear.
    #[must_use]
    pub const fn password_revealed(&self) -> bool {
        self.password_revealed
    }

    /// Session start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Session uptime in seconds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // max(0) ensures non-negative
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Observes a gesture-end event and performs the unlock transition
    /// when the gate fires.
    ///
    /// Returns the gate's outcome so the caller can start the capture
    /// cycle on [`GestureOutcome::Unlock`].
    pub fn observe_gesture_end(&mut self, start_y: f64, end_y: f64) -> GestureOutcome {
        let outcome = self.gesture.observe_end(start_y, end_y);
        if outcome == GestureOutcome::Unlock && self.phase == ScreenPhase::Locked {
            self.phase = ScreenPhase::Active;
        }
        outcome
    }

    /// Submits the buffer to the password gate.
    ///
    /// On [`AuthDecision::Authorized`] the session transitions to the
    /// home screen. On [`AuthDecision::Rejected`] the buffer is cleared
    /// and the error indicator raised; the session stays on the gated
    /// view for retry.
    pub fn submit_password(&mut self, gate: &PasswordGate) -> AuthDecision {
        let decision = gate.authorize(self.buffer.as_str());
        match decision {
            AuthDecision::Authorized => {
                self.phase = ScreenPhase::Home;
                self.error_indicator = false;
            },
            AuthDecision::Rejected => {
                self.buffer.clear();
                self.error_indicator = true;
            },
        }
        decision
    }

    /// Toggles between concealed and revealed password rendering.
    pub const fn toggle_password_visibility(&mut self) {
        self.password_revealed = !self.password_revealed;
    }

    /// Lowers the error indicator (done on each successful capture, so
    /// a stale wrong-password presentation does not outlive the next
    /// sample).
    pub const fn clear_error_indicator(&mut self) {
        self.error_indicator = false;
    }

    /// Renders the password field content for display, honoring the
    /// visibility toggle.
    #[must_use]
    pub fn password_field_content(&self) -> String {
        if self.password_revealed {
            self.buffer.as_str().to_string()
        } else {
            self.buffer.masked()
        }
    }

    /// Derives the visibility snapshot for the display port.
    #[must_use]
    pub const fn ui_state(&self) -> UiState {
        let (lock_view, active_view, home_view) = match self.phase {
            ScreenPhase::Locked => (true, false, false),
            ScreenPhase::Active => (false, true, false),
            ScreenPhase::Home => (false, false, true),
        };
        UiState {
            lock_view,
            active_view,
            home_view,
            password_field: active_view,
            password_revealed: self.password_revealed,
            error_indicator: self.error_indicator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_locked_and_empty() {
        let state = SessionState::new(8);
        assert_eq!(state.phase(), ScreenPhase::Locked);
        assert!(state.buffer().is_empty());
        assert!(!state.error_indicator());
        let ui = state.ui_state();
        assert!(ui.lock_view);
        assert!(!ui.active_view);
        assert!(!ui.home_view);
        assert!(!ui.password_field);
    }

    #[test]
    fn upward_swipe_activates_session() {
        let mut state = SessionState::new(8);
        assert_eq!(state.observe_gesture_end(500.0, 400.0), GestureOutcome::Unlock);
        assert_eq!(state.phase(), ScreenPhase::Active);
        let ui = state.ui_state();
        assert!(!ui.lock_view);
        assert!(ui.active_view);
        assert!(ui.password_field);
    }

    #[test]
    fn downward_swipe_leaves_session_locked_forever() {
        let mut state = SessionState::new(8);
        assert_eq!(state.observe_gesture_end(400.0, 500.0), GestureOutcome::Ignored);
        assert_eq!(state.phase(), ScreenPhase::Locked);
        // The shot is consumed; a proper swipe no longer unlocks.
        assert_eq!(state.observe_gesture_end(500.0, 400.0), GestureOutcome::Ignored);
        assert_eq!(state.phase(), ScreenPhase::Locked);
    }

    #[test]
    fn authorized_submit_reaches_home() {
        let gate = PasswordGate::new("TIK");
        let mut state = SessionState::new(8);
        state.observe_gesture_end(500.0, 400.0);
        for ch in "TIK".chars() {
            state.buffer_mut().push(ch);
        }
        assert_eq!(state.submit_password(&gate), AuthDecision::Authorized);
        assert_eq!(state.phase(), ScreenPhase::Home);
        let ui = state.ui_state();
        assert!(ui.home_view);
        assert!(!ui.active_view);
    }

    #[test]
    fn rejected_submit_clears_buffer_and_raises_indicator() {
        let gate = PasswordGate::new("TIK");
        let mut state = SessionState::new(8);
        state.observe_gesture_end(500.0, 400.0);
        for ch in "IKT".chars() {
            state.buffer_mut().push(ch);
        }
        assert_eq!(state.submit_password(&gate), AuthDecision::Rejected);
        assert_eq!(state.phase(), ScreenPhase::Active);
        assert!(state.buffer().is_empty());
        assert!(state.error_indicator());
        assert!(state.ui_state().error_indicator);
    }

    #[test]
    fn error_indicator_clears_on_next_capture() {
        let gate = PasswordGate::new("TIK");
        let mut state = SessionState::new(8);
        state.observe_gesture_end(500.0, 400.0);
        state.buffer_mut().push('X');
        state.submit_password(&gate);
        assert!(state.error_indicator());
        state.clear_error_indicator();
        assert!(!state.error_indicator());
    }

    #[test]
    fn password_field_content_honors_visibility_toggle() {
        let mut state = SessionState::new(8);
        state.buffer_mut().push('T');
        state.buffer_mut().push('I');
        assert_eq!(state.password_field_content(), "\u{2022}\u{2022}");
        state.toggle_password_visibility();
        assert_eq!(state.password_field_content(), "TI");
        state.toggle_password_visibility();
        assert_eq!(state.password_field_content(), "\u{2022}\u{2022}");
    }

    #[test]
    fn session_ids_are_unique_and_prefixed() {
        let a = SessionState::new(8);
        let b = SessionState::new(8);
        assert_ne!(a.id(), b.id());
        assert!(a.id().as_str().starts_with("S-"));
    }
}
