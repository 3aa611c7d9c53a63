//! poselock-engine - capture cycle controller and ports.
//!
//! This crate wires the domain logic from `poselock-core` to the outside
//! world: the classifier, video source, and display are narrow port
//! traits, and [`controller::SessionRuntime`] is the single-threaded
//! event loop that drives a session from the lock screen through capture
//! cycles to the home screen.
//!
//! # Event model
//!
//! ```text
//!                 gesture / password / shutdown events
//!                                |
//!   tick (1s) -------------> SessionRuntime <------ classification
//!                            |    |    |              outcomes
//!                      Classifier Video Display
//! ```
//!
//! Everything the session mutates is owned by the runtime; spawned
//! classification requests report back through a channel, so all state
//! changes happen on the event loop. A busy flag keeps classification
//! requests from ever overlapping.

pub mod controller;
pub mod ports;
pub mod sim;


pub use controller::{
    EngineError, InputEvent, SessionRuntime, SessionSummary, DEFAULT_TICK_PERIOD,
    INPUT_CHANNEL_CAPACITY,
};
pub use ports::{Classifier, ClassifierError, Display, Frame, VideoError, VideoSource};
