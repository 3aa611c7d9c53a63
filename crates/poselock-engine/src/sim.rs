//! Simulated port implementations.
//!
//! Deterministic stand-ins for the camera, the pose model, and the
//! display, used by the `poselock` binary's session simulation and by
//! the runtime tests. The simulated classifier models the scene in
//! front of the camera: it keeps serving the same ranking until the
//! scene is changed, the way a held pose would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use poselock_core::{ClassProbability, UiState, VideoConfig};
use tracing::{debug, info, trace};

use crate::ports::{Classifier, ClassifierError, Display, Frame, VideoError, VideoSource};

/// Confidence the simulated classifier assigns to the held pose.
const STRONG_CONFIDENCE: f32 = 0.9;

/// Scene-holding classifier.
///
/// Serves the configured ranking for every frame until the scene
/// changes. An optional fixed latency models slow inference; a one-shot
/// failure flag models a bad frame.
#[derive(Debug)]
pub struct SimClassifier {
    labels: Vec<String>,
    scene: Mutex<Vec<ClassProbability>>,
    latency: Duration,
    fail_next: AtomicBool,
}

impl SimClassifier {
    /// Creates a classifier over the given class labels, initially
    /// holding an idle scene (no class near the threshold).
    #[must_use]
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let idle = Self::idle_ranking(&labels);
        Self {
            labels,
            scene: Mutex::new(idle),
            latency: Duration::ZERO,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Adds a fixed inference latency.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Holds a pose: the given label gets strong confidence, every
    /// other class shares the remainder.
    ///
    /// # Panics
    ///
    /// Panics if `label` is not one of the configured class labels.
    #[allow(clippy::cast_precision_loss)] // class counts are tiny
    pub fn set_pose(&self, label: &str) {
        assert!(
            self.labels.iter().any(|l| l == label),
            "unknown pose label: {label}"
        );
        let rest = if self.labels.len() > 1 {
            (1.0 - STRONG_CONFIDENCE) / (self.labels.len() - 1) as f32
        } else {
            0.0
        };
        let ranking = self
            .labels
            .iter()
            .map(|l| {
                let confidence = if l == label { STRONG_CONFIDENCE } else { rest };
                ClassProbability::new(l.clone(), confidence)
            })
            .collect();
        *self.scene.lock().expect("scene lock poisoned") = ranking;
    }

    /// Clears the scene back to idle (nothing near the threshold).
    pub fn set_idle(&self) {
        *self.scene.lock().expect("scene lock poisoned") = Self::idle_ranking(&self.labels);
    }

    /// Replaces the scene with an arbitrary ranking.
    pub fn set_scene(&self, ranking: Vec<ClassProbability>) {
        *self.scene.lock().expect("scene lock poisoned") = ranking;
    }

    /// Makes the next classification fail with an inference error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    #[allow(clippy::cast_precision_loss)] // class counts are tiny
    fn idle_ranking(labels: &[String]) -> Vec<ClassProbability> {
        let confidence = if labels.is_empty() {
            0.0
        } else {
            (1.0 / labels.len() as f32).min(0.25)
        };
        labels
            .iter()
            .map(|l| ClassProbability::new(l.clone(), confidence))
            .collect()
    }
}

#[async_trait]
impl Classifier for SimClassifier {
    async fn classify(&self, frame: &Frame) -> Result<Vec<ClassProbability>, ClassifierError> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClassifierError::Inference(format!(
                "simulated inference failure on frame {}",
                frame.seq
            )));
        }
        Ok(self.scene.lock().expect("scene lock poisoned").clone())
    }
}

/// Frame counter pretending to be a camera.
///
/// While running, every `current_frame` call produces a fresh frame;
/// while stopped, the last live frame keeps being served, matching the
/// stop-and-resume capture contract.
#[derive(Debug)]
pub struct SyntheticVideo {
    width: u32,
    height: u32,
    mirrored: bool,
    running: bool,
    next_seq: u64,
    last_frame: Option<Frame>,
    fail_start: bool,
}

impl SyntheticVideo {
    /// Creates a stopped synthetic camera with the configured geometry.
    #[must_use]
    pub const fn new(config: &VideoConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            mirrored: config.mirrored,
            running: false,
            next_seq: 0,
            last_frame: None,
            fail_start: false,
        }
    }

    /// Creates a camera whose `start` always fails, for exercising the
    /// fatal video path.
    #[must_use]
    pub const fn failing(config: &VideoConfig) -> Self {
        let mut video = Self::new(config);
        video.fail_start = true;
        video
    }

    /// Frames produced so far.
    #[must_use]
    pub const fn frames_produced(&self) -> u64 {
        self.next_seq
    }
}

#[async_trait]
impl VideoSource for SyntheticVideo {
    async fn start(&mut self) -> Result<(), VideoError> {
        if self.fail_start {
            return Err(VideoError::Unavailable(
                "simulated camera acquisition failure".to_string(),
            ));
        }
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), VideoError> {
        self.running = false;
        Ok(())
    }

    fn current_frame(&mut self) -> Result<Frame, VideoError> {
        if self.running {
            let seq = self.next_seq;
            self.next_seq += 1;
            let frame = Frame {
                seq,
                width: self.width,
                height: self.height,
                mirrored: self.mirrored,
                pixels: Bytes::copy_from_slice(&seq.to_be_bytes()),
            };
            self.last_frame = Some(frame.clone());
            return Ok(frame);
        }
        self.last_frame.clone().ok_or(VideoError::NoFrame)
    }
}

/// Everything the runtime pushed to the display, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// Visibility snapshot applied.
    Ui(UiState),
    /// Frame drawn.
    Frame {
        /// Sequence number of the drawn frame.
        seq: u64,
    },
    /// Full ranking rendered.
    Ranking(Vec<ClassProbability>),
    /// Preview letter rendered.
    Preview(Option<char>),
    /// Countdown rendered.
    Countdown {
        /// Remaining seconds shown.
        remaining: u32,
        /// Whether the alarm presentation was used.
        urgent: bool,
    },
    /// Password field content rendered.
    PasswordField(String),
    /// Unrecoverable failure presented.
    Fatal(String),
}

/// Display that records every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: std::sync::Arc<Mutex<Vec<DisplayEvent>>>,
}

impl Clone for RecordingDisplay {
    /// Clones share the same recording.
    fn clone(&self) -> Self {
        Self {
            events: std::sync::Arc::clone(&self.events),
        }
    }
}

impl RecordingDisplay {
    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().expect("display lock poisoned").clone()
    }

    /// The most recent password field render, if any.
    #[must_use]
    pub fn last_password_field(&self) -> Option<String> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                DisplayEvent::PasswordField(content) => Some(content),
                _ => None,
            })
    }

    /// All fatal messages presented.
    #[must_use]
    pub fn fatal_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Fatal(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: DisplayEvent) {
        self.events.lock().expect("display lock poisoned").push(event);
    }
}

impl Display for RecordingDisplay {
    fn apply_ui(&self, ui: &UiState) {
        self.record(DisplayEvent::Ui(*ui));
    }

    fn render_frame(&self, frame: &Frame) {
        self.record(DisplayEvent::Frame { seq: frame.seq });
    }

    fn render_ranking(&self, ranking: &[ClassProbability]) {
        self.record(DisplayEvent::Ranking(ranking.to_vec()));
    }

    fn render_preview(&self, letter: Option<char>) {
        self.record(DisplayEvent::Preview(letter));
    }

    fn render_countdown(&self, remaining_secs: u32, urgent: bool) {
        self.record(DisplayEvent::Countdown {
            remaining: remaining_secs,
            urgent,
        });
    }

    fn render_password_field(&self, content: &str) {
        self.record(DisplayEvent::PasswordField(content.to_string()));
    }

    fn show_fatal(&self, message: &str) {
        self.record(DisplayEvent::Fatal(message.to_string()));
    }
}

/// Display that narrates the session through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    fn apply_ui(&self, ui: &UiState) {
        let screen = if ui.lock_view {
            "lock"
        } else if ui.active_view {
            "active"
        } else {
            "home"
        };
        info!(screen, error_indicator = ui.error_indicator, "screen updated");
    }

    fn render_frame(&self, frame: &Frame) {
        trace!(seq = frame.seq, "frame drawn");
    }

    fn render_ranking(&self, ranking: &[ClassProbability]) {
        for entry in ranking {
            debug!(class = %entry.label, confidence = entry.confidence, "class probability");
        }
    }

    fn render_preview(&self, letter: Option<char>) {
        match letter {
            Some(letter) => debug!(%letter, "preview letter"),
            None => trace!("no preview letter"),
        }
    }

    fn render_countdown(&self, remaining_secs: u32, urgent: bool) {
        if urgent {
            info!(remaining_secs, "capture imminent");
        } else {
            debug!(remaining_secs, "countdown");
        }
    }

    fn render_password_field(&self, content: &str) {
        info!(field = content, "password field updated");
    }

    fn show_fatal(&self, message: &str) {
        tracing::error!(message, "session failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifier_holds_scene_until_changed() {
        let classifier = SimClassifier::new(["I", "K", "T", "O"]);
        let mut video = SyntheticVideo::new(&VideoConfig::default());
        video.start().await.unwrap();
        let frame = video.current_frame().unwrap();

        let idle = classifier.classify(&frame).await.unwrap();
        assert_eq!(idle.len(), 4);
        assert!(idle.iter().all(|c| c.confidence <= 0.5));

        classifier.set_pose("T");
        let posed = classifier.classify(&frame).await.unwrap();
        let t = posed.iter().find(|c| c.label == "T").unwrap();
        assert!(t.confidence > 0.5);
        // Held poses persist across frames.
        let again = classifier.classify(&frame).await.unwrap();
        assert_eq!(posed, again);
    }

    #[tokio::test]
    async fn classifier_failure_is_one_shot() {
        let classifier = SimClassifier::new(["I", "K"]);
        let mut video = SyntheticVideo::new(&VideoConfig::default());
        video.start().await.unwrap();
        let frame = video.current_frame().unwrap();

        classifier.fail_next();
        assert!(classifier.classify(&frame).await.is_err());
        assert!(classifier.classify(&frame).await.is_ok());
    }

    #[tokio::test]
    async fn stopped_video_serves_last_live_frame() {
        let mut video = SyntheticVideo::new(&VideoConfig::default());
        video.start().await.unwrap();
        let live = video.current_frame().unwrap();
        video.stop().await.unwrap();

        let frozen = video.current_frame().unwrap();
        assert_eq!(frozen, live);
        let frozen_again = video.current_frame().unwrap();
        assert_eq!(frozen_again.seq, live.seq);

        video.start().await.unwrap();
        let resumed = video.current_frame().unwrap();
        assert!(resumed.seq > live.seq);
    }

    #[tokio::test]
    async fn video_before_first_start_has_no_frame() {
        let mut video = SyntheticVideo::new(&VideoConfig::default());
        assert!(matches!(video.current_frame(), Err(VideoError::NoFrame)));
    }
}
