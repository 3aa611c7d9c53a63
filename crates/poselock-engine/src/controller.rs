//! Capture cycle controller and session runtime.
//!
//! [`SessionRuntime`] is the single-threaded event loop of a kiosk
//! session. It reacts to three sources:
//!
//! 1. A fixed one-second tick driving the capture countdown.
//! 2. External input events (gestures, password actions, shutdown).
//! 3. Classification outcomes reporting back from dispatched requests.
//!
//! # Capture cycle
//!
//! While the session is in the active phase, each interval runs a
//! two-state machine:
//!
//! ```text
//!        tick..tick..tick (countdown)          outcome received
//! Live ---------------------------> Capturing ----------------> Live
//!        (preview only)               stop video, classify      resume video
//! ```
//!
//! In `Live`, frames and display-only classification labels flow to the
//! display; the sample buffer is never touched. On countdown expiry the
//! controller stops the video source, takes exactly one classification
//! sample of the last frame, appends the winning class's letter to the
//! buffer (if any class clears the confidence threshold), and resumes.
//!
//! # Invariants
//!
//! - At most one classification request (preview or capture) is
//!   outstanding at any time. Ticks and expiries that land while a
//!   request is in flight skip their classification; a hung request
//!   stalls cycles but never overlaps a new one, and the timer keeps
//!   firing.
//! - All state mutation happens on this loop. Outcomes re-enter through
//!   a channel, so appends cannot reorder.
//! - A classifier error drops the cycle's sample and the controller
//!   resumes on the next scheduled tick. A video source error is fatal.

use std::sync::Arc;
use std::time::Duration;

use poselock_core::classify::select_candidate;
use poselock_core::gesture::GestureOutcome;
use poselock_core::password::{AuthDecision, PasswordGate};
use poselock_core::session::{ScreenPhase, SessionState};
use poselock_core::{ClassProbability, Countdown, CountdownTick, KioskConfig};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::ports::{Classifier, ClassifierError, Display, Frame, VideoError, VideoSource};

/// Tick period of the capture countdown.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Suggested capacity for the input event channel.
pub const INPUT_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the internal classification outcome channel. One request
/// is outstanding at a time, so this never fills.
const OUTCOME_CHANNEL_CAPACITY: usize = 4;

/// External input events consumed by the session runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A gesture began at the given vertical screen coordinate.
    GestureStart {
        /// Vertical coordinate; larger is lower on screen.
        y: f64,
    },
    /// A gesture ended at the given vertical screen coordinate.
    GestureEnd {
        /// Vertical coordinate; larger is lower on screen.
        y: f64,
    },
    /// Submit the sample buffer to the password gate.
    SubmitPassword,
    /// Remove the final buffered character.
    DeleteLast,
    /// Toggle between concealed and revealed password rendering.
    TogglePasswordVisibility,
    /// End the session.
    Shutdown,
}

/// Fatal session errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The video source failed; the session cannot continue.
    #[error("video source failed: {0}")]
    Video(#[from] VideoError),
}

/// Final report of a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: String,
    /// Screen phase at shutdown.
    pub final_phase: ScreenPhase,
    /// Capture cycles that ran to completion (including skipped-sample
    /// cycles).
    pub cycles_completed: u64,
    /// Characters appended to the sample buffer by captures.
    pub samples_appended: u64,
    /// Whether the password gate authorized the session.
    pub authorized: bool,
    /// Session uptime in seconds.
    pub uptime_secs: u64,
}

/// Capture cycle state within one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    /// Continuous preview; no buffer mutation.
    Live,
    /// One classification sample is being taken.
    Capturing,
}

/// What a dispatched classification was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassifyPurpose {
    /// Display-only label refresh while live.
    Preview,
    /// A capture cycle sample that may append to the buffer.
    Capture,
}

/// Completed classification request re-entering the event loop.
#[derive(Debug)]
struct ClassifyOutcome {
    purpose: ClassifyPurpose,
    result: Result<Vec<ClassProbability>, ClassifierError>,
}

/// The session event loop. See the module docs for the model.
pub struct SessionRuntime<C, V, D> {
    config: KioskConfig,
    state: SessionState,
    password_gate: PasswordGate,
    countdown: Countdown,
    cycle_phase: CyclePhase,
    classify_busy: bool,
    gesture_start_y: f64,
    preview_enabled: bool,
    tick_period: Duration,
    classifier: Arc<C>,
    video: V,
    display: D,
    cycles_completed: u64,
    samples_appended: u64,
    authorized: bool,
}

impl<C, V, D> SessionRuntime<C, V, D>
where
    C: Classifier + 'static,
    V: VideoSource,
    D: Display,
{
    /// Creates a runtime for one session.
    ///
    /// `config` is expected to have passed [`KioskConfig::validate`];
    /// the runtime does not re-validate.
    #[must_use]
    pub fn new(config: KioskConfig, classifier: Arc<C>, video: V, display: D) -> Self {
        let state = SessionState::new(config.session.max_buffer_len);
        let password_gate = PasswordGate::new(config.session.target_password.clone());
        let countdown = Countdown::new(
            config.capture.initial_grace_secs,
            config.capture.steady_interval_secs,
            config.capture.urgency_threshold_secs,
        );
        Self {
            config,
            state,
            password_gate,
            countdown,
            cycle_phase: CyclePhase::Live,
            classify_busy: false,
            gesture_start_y: 0.0,
            preview_enabled: true,
            tick_period: DEFAULT_TICK_PERIOD,
            classifier,
            video,
            display,
            cycles_completed: 0,
            samples_appended: 0,
            authorized: false,
        }
    }

    /// Overrides the tick period (tests and accelerated simulations).
    #[must_use]
    pub const fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Disables the display-only preview classification while live.
    #[must_use]
    pub const fn with_preview(mut self, enabled: bool) -> Self {
        self.preview_enabled = enabled;
        self
    }

    /// Runs the session until shutdown.
    ///
    /// Blocks until a [`InputEvent::Shutdown`] arrives or the input
    /// channel closes, then reports the [`SessionSummary`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Video`] if the video source fails; the
    /// failure is surfaced to the display before returning.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<InputEvent>,
    ) -> Result<SessionSummary, EngineError> {
        info!(
            session_id = %self.state.id(),
            grace_secs = self.config.capture.initial_grace_secs,
            steady_secs = self.config.capture.steady_interval_secs,
            threshold = self.config.capture.confidence_threshold,
            "kiosk session starting"
        );
        self.display.apply_ui(&self.state.ui_state());

        let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; consume it so
        // the countdown starts a full period out.
        ticker.tick().await;

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.on_tick(&outcome_tx).await {
                        break Err(err);
                    }
                }
                Some(completed) = outcome_rx.recv() => {
                    if let Err(err) = self.on_classify_outcome(completed).await {
                        break Err(err);
                    }
                }
                maybe_event = inputs.recv() => {
                    match maybe_event {
                        Some(event) => match self.on_input(event).await {
                            Ok(true) => break Ok(()),
                            Ok(false) => {},
                            Err(err) => break Err(err),
                        },
                        // Input side dropped: the hosting session ended.
                        None => break Ok(()),
                    }
                }
            }
        };

        match outcome {
            Ok(()) => {
                let summary = self.summary();
                info!(
                    session_id = %summary.session_id,
                    cycles = summary.cycles_completed,
                    samples = summary.samples_appended,
                    authorized = summary.authorized,
                    "kiosk session ended"
                );
                Ok(summary)
            },
            Err(err) => {
                self.display.show_fatal(&err.to_string());
                Err(err)
            },
        }
    }

    /// One second elapsed.
    async fn on_tick(
        &mut self,
        outcome_tx: &mpsc::Sender<ClassifyOutcome>,
    ) -> Result<(), EngineError> {
        if self.state.phase() != ScreenPhase::Active {
            return Ok(());
        }
        match self.countdown.tick() {
            CountdownTick::Running { remaining, urgent } => {
                self.display.render_countdown(remaining, urgent);
                self.preview_pass(outcome_tx)?;
            },
            CountdownTick::Expired => {
                self.begin_capture(outcome_tx).await?;
            },
        }
        Ok(())
    }

    /// Live preview: draw the current frame and refresh the display-only
    /// classification labels.
    fn preview_pass(
        &mut self,
        outcome_tx: &mpsc::Sender<ClassifyOutcome>,
    ) -> Result<(), EngineError> {
        if self.cycle_phase != CyclePhase::Live {
            return Ok(());
        }
        let frame = self.video.current_frame()?;
        self.display.render_frame(&frame);
        if self.preview_enabled && !self.classify_busy {
            self.dispatch_classify(ClassifyPurpose::Preview, frame, outcome_tx);
        }
        Ok(())
    }

    /// Countdown expiry: transition Live -> Capturing and take exactly
    /// one classification sample.
    async fn begin_capture(
        &mut self,
        outcome_tx: &mpsc::Sender<ClassifyOutcome>,
    ) -> Result<(), EngineError> {
        if self.classify_busy {
            warn!("classification still in flight; skipping this capture cycle");
            return Ok(());
        }
        debug!("capture cycle: suspending live preview");
        self.video.stop().await?;
        let frame = self.video.current_frame()?;
        self.cycle_phase = CyclePhase::Capturing;
        self.dispatch_classify(ClassifyPurpose::Capture, frame, outcome_tx);
        Ok(())
    }

    /// Hands a frame to the classifier off-loop. The busy flag stays set
    /// until the outcome re-enters the loop.
    fn dispatch_classify(
        &mut self,
        purpose: ClassifyPurpose,
        frame: Frame,
        outcome_tx: &mpsc::Sender<ClassifyOutcome>,
    ) {
        self.classify_busy = true;
        let classifier = Arc::clone(&self.classifier);
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let result = classifier.classify(&frame).await;
            // A dropped receiver means the session already ended.
            let _ = tx.send(ClassifyOutcome { purpose, result }).await;
        });
    }

    /// A dispatched classification finished.
    async fn on_classify_outcome(&mut self, outcome: ClassifyOutcome) -> Result<(), EngineError> {
        self.classify_busy = false;
        match outcome.purpose {
            ClassifyPurpose::Preview => match outcome.result {
                Ok(ranking) => {
                    self.display.render_ranking(&ranking);
                    let letter = self.winning_letter(&ranking);
                    self.display.render_preview(letter);
                },
                Err(error) => debug!(%error, "preview classification failed"),
            },
            ClassifyPurpose::Capture => {
                match outcome.result {
                    Ok(ranking) => self.apply_capture(&ranking),
                    Err(error) => {
                        warn!(%error, "capture classification failed; dropping this cycle's sample");
                    },
                }
                self.finish_capture_cycle().await?;
            },
        }
        Ok(())
    }

    /// Applies one successful capture sample to the session.
    fn apply_capture(&mut self, ranking: &[ClassProbability]) {
        self.display.render_ranking(ranking);
        match select_candidate(
            ranking,
            self.config.capture.confidence_threshold,
            self.config.capture.tie_policy,
        ) {
            Some(winner) => match self.config.key_for(&winner.label) {
                Some(key) => {
                    if self.state.buffer_mut().push(key) {
                        self.samples_appended += 1;
                        info!(
                            class = %winner.label,
                            confidence = winner.confidence,
                            buffered = self.state.buffer().len(),
                            "capture appended sample"
                        );
                    }
                    self.display
                        .render_password_field(&self.state.password_field_content());
                },
                None => {
                    warn!(class = %winner.label, "winning class has no letter binding; dropping sample");
                },
            },
            None => debug!("no class cleared the confidence threshold this cycle"),
        }
        // A completed capture supersedes any stale wrong-password
        // presentation.
        self.state.clear_error_indicator();
        self.display.apply_ui(&self.state.ui_state());
    }

    /// Returns to Live, resuming the video source unless the session has
    /// already left the active phase.
    async fn finish_capture_cycle(&mut self) -> Result<(), EngineError> {
        if self.state.phase() == ScreenPhase::Active {
            self.video.start().await?;
        }
        self.cycle_phase = CyclePhase::Live;
        self.cycles_completed += 1;
        Ok(())
    }

    /// Handles one external input event. Returns `true` on shutdown.
    async fn on_input(&mut self, event: InputEvent) -> Result<bool, EngineError> {
        match event {
            InputEvent::GestureStart { y } => {
                self.gesture_start_y = y;
            },
            InputEvent::GestureEnd { y } => {
                let outcome = self.state.observe_gesture_end(self.gesture_start_y, y);
                if outcome == GestureOutcome::Unlock {
                    self.unlock().await?;
                }
            },
            InputEvent::SubmitPassword => self.submit_password().await?,
            InputEvent::DeleteLast => {
                if self.state.phase() == ScreenPhase::Active {
                    self.state.buffer_mut().delete_last();
                    self.display
                        .render_password_field(&self.state.password_field_content());
                }
            },
            InputEvent::TogglePasswordVisibility => {
                if self.state.phase() == ScreenPhase::Active {
                    self.state.toggle_password_visibility();
                    self.display
                        .render_password_field(&self.state.password_field_content());
                    self.display.apply_ui(&self.state.ui_state());
                }
            },
            InputEvent::Shutdown => {
                debug!("shutdown requested");
                return Ok(true);
            },
        }
        Ok(false)
    }

    /// The gesture gate fired: reveal the active view and start the
    /// capture cycle.
    async fn unlock(&mut self) -> Result<(), EngineError> {
        info!(session_id = %self.state.id(), "unlock gesture accepted; starting capture cycle");
        self.video.start().await?;
        self.display.apply_ui(&self.state.ui_state());
        Ok(())
    }

    /// Submits the buffer to the password gate.
    async fn submit_password(&mut self) -> Result<(), EngineError> {
        if self.state.phase() != ScreenPhase::Active {
            debug!(phase = ?self.state.phase(), "ignoring password submit outside the active phase");
            return Ok(());
        }
        match self.state.submit_password(&self.password_gate) {
            AuthDecision::Authorized => {
                self.authorized = true;
                info!(session_id = %self.state.id(), "password accepted; entering home screen");
                // The camera has no audience once the home screen is up.
                if self.cycle_phase == CyclePhase::Live {
                    self.video.stop().await?;
                }
                self.display.apply_ui(&self.state.ui_state());
            },
            AuthDecision::Rejected => {
                warn!("password rejected; clearing sample buffer");
                self.display
                    .render_password_field(&self.state.password_field_content());
                self.display.apply_ui(&self.state.ui_state());
            },
        }
        Ok(())
    }

    /// Looks up the letter the winning class of `ranking` would
    /// contribute.
    fn winning_letter(&self, ranking: &[ClassProbability]) -> Option<char> {
        select_candidate(
            ranking,
            self.config.capture.confidence_threshold,
            self.config.capture.tie_policy,
        )
        .and_then(|winner| self.config.key_for(&winner.label))
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.state.id().to_string(),
            final_phase: self.state.phase(),
            cycles_completed: self.cycles_completed,
            samples_appended: self.samples_appended,
            authorized: self.authorized,
            uptime_secs: self.state.uptime_secs(),
        }
    }
}
