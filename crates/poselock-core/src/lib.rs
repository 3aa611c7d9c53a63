//! poselock-core - domain logic for the poselock kiosk session engine.
//!
//! This crate holds the pure, synchronous core of the kiosk lock screen:
//! the password sample buffer, classification candidate selection, the
//! one-shot gesture unlock gate, the password gate, the capture countdown,
//! and the explicit session state that ties them together. Everything
//! asynchronous (ports, the capture cycle controller) lives in
//! `poselock-engine`.
//!
//! # Architecture
//!
//! ```text
//! GestureGate --unlock--> SessionState --reads/writes--> SampleBuffer
//!                              ^                              ^
//!                              |                              |
//!                        PasswordGate                  select_candidate
//!                      (authorize/clear)            (one letter per cycle)
//! ```
//!
//! All state mutation happens on a single logical thread; none of the
//! types here require locking.

pub mod buffer;
pub mod classify;
pub mod config;
pub mod cycle;
pub mod gesture;
pub mod password;
pub mod session;

pub use buffer::SampleBuffer;
pub use classify::{select_candidate, ClassProbability, TiePolicy, DEFAULT_CONFIDENCE_THRESHOLD};
pub use config::{CaptureConfig, ClassBinding, ConfigError, KioskConfig, SessionConfig, VideoConfig};
pub use cycle::{Countdown, CountdownTick};
pub use gesture::{GateState, GestureGate, GestureOutcome};
pub use password::{AuthDecision, PasswordGate};
pub use session::{ScreenPhase, SessionId, SessionState, UiState};
