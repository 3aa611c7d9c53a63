//! One-shot gesture unlock gate.
//!
//! The gate is a two-state machine with a single legal transition:
//!
//! ```text
//! Armed --first gesture-end--> Fired
//! ```
//!
//! Only the first gesture-end event of a session can unlock, and only if
//! that gesture moved upward (end coordinate above start coordinate).
//! The transition to [`GateState::Fired`] happens unconditionally on the
//! first end event, whatever its direction: a downward or degenerate
//! first swipe consumes the shot. Every later end event is ignored.

use tracing::debug;

/// Gesture gate lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No gesture-end event has been observed yet.
    Armed,
    /// The single shot has been consumed.
    Fired,
}

/// Result of observing one gesture-end event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The gate fired on an upward swipe: perform the unlock transition.
    Unlock,
    /// No transition: wrong direction, or the gate had already fired.
    Ignored,
}

/// Edge detector over the session's swipe gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureGate {
    state: GateState,
}

impl Default for GestureGate {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureGate {
    /// Creates an armed gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: GateState::Armed,
        }
    }

    /// Current gate state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Whether the single shot has been consumed.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        matches!(self.state, GateState::Fired)
    }

    /// Observes a gesture-end event.
    ///
    /// `start_y` and `end_y` are vertical screen coordinates (larger is
    /// lower on screen). An upward motion has `end_y < start_y`. Callers
    /// that never saw a gesture-start report `start_y = 0.0`; such an
    /// end event still consumes the shot.
    pub fn observe_end(&mut self, start_y: f64, end_y: f64) -> GestureOutcome {
        match self.state {
            GateState::Fired => GestureOutcome::Ignored,
            GateState::Armed => {
                self.state = GateState::Fired;
                if end_y < start_y {
                    GestureOutcome::Unlock
                } else {
                    debug!(start_y, end_y, "first gesture was not upward; shot consumed");
                    GestureOutcome::Ignored
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upward_first_swipe_unlocks() {
        let mut gate = GestureGate::new();
        assert_eq!(gate.observe_end(500.0, 400.0), GestureOutcome::Unlock);
        assert!(gate.has_fired());
    }

    #[test]
    fn downward_first_swipe_consumes_the_shot() {
        let mut gate = GestureGate::new();
        assert_eq!(gate.observe_end(400.0, 500.0), GestureOutcome::Ignored);
        assert!(gate.has_fired());
        // A later upward swipe can no longer unlock.
        assert_eq!(gate.observe_end(500.0, 400.0), GestureOutcome::Ignored);
    }

    #[test]
    fn second_swipe_of_same_shape_is_a_noop() {
        let mut gate = GestureGate::new();
        assert_eq!(gate.observe_end(500.0, 400.0), GestureOutcome::Unlock);
        assert_eq!(gate.observe_end(500.0, 400.0), GestureOutcome::Ignored);
        assert_eq!(gate.state(), GateState::Fired);
    }

    #[test]
    fn stationary_gesture_does_not_unlock() {
        let mut gate = GestureGate::new();
        assert_eq!(gate.observe_end(450.0, 450.0), GestureOutcome::Ignored);
        assert!(gate.has_fired());
    }

    #[test]
    fn end_without_start_uses_zero_origin() {
        // A stray end event before any start is measured against 0 and
        // cannot be upward, but it still consumes the single shot.
        let mut gate = GestureGate::new();
        assert_eq!(gate.observe_end(0.0, 300.0), GestureOutcome::Ignored);
        assert_eq!(gate.observe_end(500.0, 400.0), GestureOutcome::Ignored);
    }
}
