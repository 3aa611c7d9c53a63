//! Port traits at the engine's seams.
//!
//! The engine consumes a pose classifier and a video source, and exposes
//! its observable state to a display. Each collaborator is a narrow
//! trait so the runtime can be driven end-to-end against the simulated
//! implementations in [`crate::sim`]; real camera and model adapters
//! live outside this repository.

use async_trait::async_trait;
use bytes::Bytes;
use poselock_core::{ClassProbability, UiState};
use thiserror::Error;

/// One captured video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Monotonic frame sequence number.
    pub seq: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Whether the frame is mirrored horizontally.
    pub mirrored: bool,
    /// Raw pixel payload. Opaque to the engine; only the classifier
    /// interprets it.
    pub pixels: Bytes,
}

/// Errors from the classifier port.
///
/// Classification failures are recoverable: the controller drops the
/// current cycle's sample and resumes on the next scheduled tick.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    /// The model rejected the frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Inference failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors from the video source port.
///
/// Video source failures are fatal to the enclosing session: there is no
/// retry policy, and the runtime surfaces them to the display as an
/// unrecoverable state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VideoError {
    /// The device could not be acquired or failed mid-session.
    #[error("video source unavailable: {0}")]
    Unavailable(String),

    /// No frame has been produced yet.
    #[error("no frame has been produced yet")]
    NoFrame,
}

/// Pose classification over video frames.
///
/// `classify` returns one entry per trained class, in fixed model order.
/// Model loading is the implementation's concern at construction time.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifies one frame into the full ranked class list.
    async fn classify(&self, frame: &Frame) -> Result<Vec<ClassProbability>, ClassifierError>;
}

/// A startable/stoppable stream of video frames.
///
/// Acquisition parameters (dimensions, mirroring) are configuration
/// handed to the implementation at construction. The stream is stopped
/// and resumed around each capture without reconstruction; while
/// stopped, `current_frame` keeps returning the last live frame so the
/// capture can classify it.
#[async_trait]
pub trait VideoSource: Send {
    /// Starts (or resumes) frame production. Idempotent.
    async fn start(&mut self) -> Result<(), VideoError>;

    /// Stops frame production, keeping the last frame available.
    /// Idempotent.
    async fn stop(&mut self) -> Result<(), VideoError>;

    /// Returns the most recent frame.
    fn current_frame(&mut self) -> Result<Frame, VideoError>;
}

/// Sink for everything the session makes observable.
///
/// Implementations are cheap fire-and-forget writes (a DOM, a console, a
/// test recorder); the engine never reads back from the display.
pub trait Display: Send {
    /// Applies the screen/field visibility snapshot.
    fn apply_ui(&self, ui: &UiState);

    /// Draws one live frame.
    fn render_frame(&self, frame: &Frame);

    /// Renders the full ranked classification, one entry per class.
    fn render_ranking(&self, ranking: &[ClassProbability]);

    /// Renders the letter the current frame would contribute, if any.
    fn render_preview(&self, letter: Option<char>);

    /// Renders the countdown; `urgent` selects the alarm presentation.
    fn render_countdown(&self, remaining_secs: u32, urgent: bool);

    /// Renders the password field content (already masked or revealed
    /// by the caller).
    fn render_password_field(&self, content: &str);

    /// Presents an unrecoverable failure.
    fn show_fatal(&self, message: &str);
}
