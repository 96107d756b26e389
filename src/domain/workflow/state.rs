//! Workflow state machine
//!
//! State machine:
//!   CAMERA_ACTIVE -> CAPTURING      (begin_capture + enter_processing)
//!   CAMERA_ACTIVE -> MANUAL_ENTRY   (fall_back_to_manual after a device failure)
//!   CAMERA_ACTIVE | RESULT -> MANUAL_ENTRY (request_manual_entry)
//!   MANUAL_ENTRY  -> CAPTURING      (begin_manual_submission, non-empty text)
//!   CAPTURING     -> CONFIRMATION   (apply_recognition, match found)
//!   CAPTURING     -> RESULT         (apply_recognition / fail_recognition)
//!   CONFIRMATION  -> MANUAL_ENTRY   (edit)
//!   CONFIRMATION  -> RESULT         (begin_send + apply_send)
//!   any           -> CAMERA_ACTIVE  (restart)
//!
//! Every asynchronous call is issued with the current generation. Responses
//! carrying an older generation are discarded.

use std::fmt;
use thiserror::Error;

use crate::domain::matching::{EmailPreview, ExtractionResult, Subscriber};

/// Shown when a manual submission is empty
pub const VALIDATION_MESSAGE: &str = "Please enter an address.";

/// Shown once the workflow gives up on the camera
pub const CAMERA_FALLBACK_WARNING: &str = "Could not access the camera. Please use manual entry.";

/// Generic transport failure while recognizing an image
pub const IMAGE_FAILURE_MESSAGE: &str = "An error occurred while processing the image.";

/// Generic transport failure while recognizing typed text
pub const TEXT_FAILURE_MESSAGE: &str = "An error occurred while processing the address.";

/// Inline message when the dispatch call fails
pub const SEND_FAILURE_MESSAGE: &str = "Failed to send the email. Please try again.";

/// Workflow phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    CameraActive,
    Capturing,
    ManualEntry,
    Confirmation,
    Result,
}

impl Phase {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CameraActive => "camera",
            Self::Capturing => "processing",
            Self::ManualEntry => "manual entry",
            Self::Confirmation => "confirmation",
            Self::Result => "result",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What is being recognized while in `Capturing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Image,
    Text,
}

impl SubmissionKind {
    /// Generic message for a transport failure of this kind of submission
    pub const fn failure_message(&self) -> &'static str {
        match self {
            Self::Image => IMAGE_FAILURE_MESSAGE,
            Self::Text => TEXT_FAILURE_MESSAGE,
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A validation message, warning or inline failure shown next to the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Email preview lifecycle during confirmation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    Loading,
    Ready(EmailPreview),
    Failed(String),
}

/// Error when an action is not allowed in the current phase
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_phase} phase")]
pub struct InvalidStateTransition {
    pub current_phase: Phase,
    pub action: String,
}

/// Outcome of starting a manual submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualSubmission {
    /// A recognition call is already outstanding
    Dropped,
    /// Empty input, validation notice set
    Rejected,
    /// Text accepted; submit it with this generation
    Accepted { generation: u64, text: String },
}

/// Outcome of applying a recognition response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionApplied {
    /// Response belonged to an older generation and was dropped
    Stale,
    /// Match found; the preview for this subscriber should be fetched
    Confirmation(Subscriber),
    Result,
}

/// Everything needed to dispatch the notification email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub generation: u64,
    pub subscriber: Subscriber,
    pub extracted_address: String,
}

/// The single in-memory workflow value, owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    phase: Phase,
    generation: u64,
    result: Option<ExtractionResult>,
    capture_in_flight: bool,
    send_in_flight: bool,
    device_failure: Option<String>,
    notice: Option<Notice>,
    manual_input: String,
    preview: PreviewState,
    processing: Option<SubmissionKind>,
    transport_error: Option<String>,
}

impl WorkflowState {
    /// Create the initial state: camera active, generation zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    pub fn is_capture_in_flight(&self) -> bool {
        self.capture_in_flight
    }

    pub fn is_send_in_flight(&self) -> bool {
        self.send_in_flight
    }

    /// Failure reason while in the `DeviceFailed` sub-condition of `CameraActive`
    pub fn device_failure(&self) -> Option<&str> {
        self.device_failure.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn manual_input(&self) -> &str {
        &self.manual_input
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn processing(&self) -> Option<SubmissionKind> {
        self.processing
    }

    pub fn transport_error(&self) -> Option<&str> {
        self.transport_error.as_deref()
    }

    /// Whether a response issued under `generation` must be discarded
    pub fn is_stale(&self, generation: u64) -> bool {
        generation != self.generation
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_phase: self.phase,
            action: action.to_string(),
        }
    }

    /// Set the capture-in-flight guard.
    ///
    /// Returns `Ok(None)` when a capture is already outstanding; the trigger is dropped.
    pub fn begin_capture(&mut self) -> Result<Option<u64>, InvalidStateTransition> {
        if self.capture_in_flight {
            return Ok(None);
        }
        if self.phase != Phase::CameraActive {
            return Err(self.invalid("capture"));
        }
        if self.device_failure.is_some() {
            return Err(self.invalid("capture without a working camera"));
        }
        self.capture_in_flight = true;
        self.notice = None;
        Ok(Some(self.generation))
    }

    /// Clear the guard after a snapshot could not be taken. Stays in `CameraActive`.
    pub fn abort_capture(&mut self, generation: u64, reason: &str) -> bool {
        if self.is_stale(generation) || !self.capture_in_flight {
            return false;
        }
        self.capture_in_flight = false;
        self.notice = Some(Notice::error(format!("Could not take a snapshot: {}", reason)));
        true
    }

    /// Move into `Capturing` once the submission is ready to go out
    pub fn enter_processing(&mut self, generation: u64, kind: SubmissionKind) -> bool {
        if self.is_stale(generation) || !self.capture_in_flight {
            return false;
        }
        self.phase = Phase::Capturing;
        self.processing = Some(kind);
        self.result = None;
        self.preview = PreviewState::Idle;
        self.transport_error = None;
        self.device_failure = None;
        self.notice = None;
        true
    }

    /// Validate manual text and, if non-empty, move into `Capturing`
    pub fn begin_manual_submission(
        &mut self,
        text: &str,
    ) -> Result<ManualSubmission, InvalidStateTransition> {
        if self.capture_in_flight {
            return Ok(ManualSubmission::Dropped);
        }
        if self.phase != Phase::ManualEntry {
            return Err(self.invalid("submit an address"));
        }

        self.manual_input = text.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.notice = Some(Notice::warning(VALIDATION_MESSAGE));
            return Ok(ManualSubmission::Rejected);
        }

        self.capture_in_flight = true;
        self.enter_processing(self.generation, SubmissionKind::Text);
        Ok(ManualSubmission::Accepted {
            generation: self.generation,
            text: trimmed.to_string(),
        })
    }

    /// Apply a recognition response
    pub fn apply_recognition(
        &mut self,
        generation: u64,
        result: ExtractionResult,
    ) -> RecognitionApplied {
        if self.is_stale(generation) || self.phase != Phase::Capturing {
            return RecognitionApplied::Stale;
        }
        self.capture_in_flight = false;
        self.processing = None;

        if result.is_confirmable_match() {
            let subscriber = result.subscriber.clone().unwrap_or_default();
            self.phase = Phase::Confirmation;
            self.send_in_flight = false;
            self.preview = PreviewState::Loading;
            self.result = Some(result);
            return RecognitionApplied::Confirmation(subscriber);
        }

        self.phase = Phase::Result;
        self.result = Some(result);
        RecognitionApplied::Result
    }

    /// Record a transport failure of the recognition call
    pub fn fail_recognition(&mut self, generation: u64, message: &str) -> bool {
        if self.is_stale(generation) || self.phase != Phase::Capturing {
            return false;
        }
        self.capture_in_flight = false;
        self.processing = None;
        self.result = None;
        self.phase = Phase::Result;
        self.transport_error = Some(message.to_string());
        true
    }

    /// Store the outcome of the preview fetch
    pub fn apply_preview(&mut self, generation: u64, preview: Result<EmailPreview, String>) -> bool {
        if self.is_stale(generation) || self.preview != PreviewState::Loading {
            return false;
        }
        self.preview = match preview {
            Ok(preview) => PreviewState::Ready(preview),
            Err(message) => PreviewState::Failed(message),
        };
        true
    }

    /// Switch to manual entry from the camera or a result
    pub fn request_manual_entry(&mut self) -> Result<(), InvalidStateTransition> {
        match self.phase {
            Phase::ManualEntry => Ok(()),
            Phase::CameraActive | Phase::Result => {
                // Nothing issued before the switch may land afterwards
                self.generation += 1;
                self.phase = Phase::ManualEntry;
                self.capture_in_flight = false;
                self.processing = None;
                self.device_failure = None;
                self.transport_error = None;
                self.notice = None;
                Ok(())
            }
            _ => Err(self.invalid("switch to manual entry")),
        }
    }

    /// Replace the manual form contents without submitting
    pub fn fill_manual_input(&mut self, text: &str) -> Result<(), InvalidStateTransition> {
        if self.phase != Phase::ManualEntry {
            return Err(self.invalid("fill the address form"));
        }
        self.manual_input = text.to_string();
        self.notice = None;
        Ok(())
    }

    /// Enter the `DeviceFailed` sub-condition
    pub fn record_device_failure(&mut self, generation: u64, reason: &str) -> bool {
        if self.is_stale(generation) || self.phase != Phase::CameraActive {
            return false;
        }
        self.device_failure = Some(reason.to_string());
        true
    }

    /// Fall back to manual entry after a failed acquisition
    pub fn fall_back_to_manual(&mut self, generation: u64) -> bool {
        if self.is_stale(generation) || self.phase != Phase::CameraActive {
            return false;
        }
        self.phase = Phase::ManualEntry;
        self.device_failure = None;
        self.capture_in_flight = false;
        self.notice = Some(Notice::warning(CAMERA_FALLBACK_WARNING));
        true
    }

    /// Go back from confirmation to the manual form, pre-filled with the recognized address.
    /// The match itself is kept until a new submission replaces it.
    pub fn edit(&mut self) -> Result<(), InvalidStateTransition> {
        if self.phase != Phase::Confirmation {
            return Err(self.invalid("edit"));
        }
        if self.send_in_flight {
            return Err(self.invalid("edit while the email is being sent"));
        }
        self.manual_input = self
            .result
            .as_ref()
            .and_then(|r| r.extracted_address.clone())
            .unwrap_or_default();
        self.phase = Phase::ManualEntry;
        self.notice = None;
        Ok(())
    }

    /// Disable the send trigger and hand out the dispatch payload.
    ///
    /// Returns `Ok(None)` when a send is already outstanding.
    pub fn begin_send(&mut self) -> Result<Option<SendTicket>, InvalidStateTransition> {
        if self.phase != Phase::Confirmation {
            return Err(self.invalid("send"));
        }
        if self.send_in_flight {
            return Ok(None);
        }
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| self.invalid("send without a match"))?;
        let subscriber = result
            .subscriber
            .clone()
            .ok_or_else(|| self.invalid("send without a matched subscriber"))?;
        let extracted_address = result.extracted_address.clone().unwrap_or_default();

        self.send_in_flight = true;
        self.notice = None;
        Ok(Some(SendTicket {
            generation: self.generation,
            subscriber,
            extracted_address,
        }))
    }

    /// Apply the dispatch response
    pub fn apply_send(&mut self, generation: u64, result: ExtractionResult) -> bool {
        if self.is_stale(generation) || self.phase != Phase::Confirmation || !self.send_in_flight
        {
            return false;
        }
        self.send_in_flight = false;
        self.phase = Phase::Result;
        self.result = Some(result);
        self.preview = PreviewState::Idle;
        true
    }

    /// Re-enable the send trigger after a failed dispatch. Stays in `Confirmation`.
    pub fn fail_send(&mut self, generation: u64, message: &str) -> bool {
        if self.is_stale(generation) || self.phase != Phase::Confirmation || !self.send_in_flight
        {
            return false;
        }
        self.send_in_flight = false;
        self.notice = Some(Notice::error(message));
        true
    }

    /// Reset everything and re-enter `CameraActive` under a fresh generation
    pub fn restart(&mut self) -> u64 {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
        self.generation
    }
}
