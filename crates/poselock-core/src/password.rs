//! Password gate.
//!
//! Compares the accumulated sample buffer against the configured target
//! password. Matching is exact and case-sensitive; there is no partial
//! credit. The gate itself is pure - clearing the buffer and raising the
//! error indicator on rejection belong to the session state transition
//! (see [`crate::session::SessionState::submit_password`]).

/// Outcome of a password authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// The buffer matched the target; transition to the home screen.
    Authorized,
    /// The buffer did not match; clear it and present the error state.
    Rejected,
}

impl AuthDecision {
    /// Whether this decision authorizes entry.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Gate comparing candidate strings against the target password.
#[derive(Debug, Clone)]
pub struct PasswordGate {
    target: String,
}

impl PasswordGate {
    /// Creates a gate for the given target password.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Compares `candidate` to the target via exact string equality.
    #[must_use]
    pub fn authorize(&self, candidate: &str) -> AuthDecision {
        if candidate == self.target {
            AuthDecision::Authorized
        } else {
            AuthDecision::Rejected
        }
    }
}
