//! Pure projection of the workflow state into what the user sees
//!
//! Nothing here toggles visibility imperatively: a front-end calls
//! [`View::render`] after every transition and draws the result.

use std::fmt;

use crate::domain::matching::{ResultStatus, Subscriber};

use super::state::{Notice, Phase, PreviewState, SubmissionKind, WorkflowState};

/// Status line while an image is being recognized
pub const PROCESSING_IMAGE: &str = "Processing image...";

/// Status line while typed text is being recognized
pub const PROCESSING_ADDRESS: &str = "Processing address...";

/// Status line during confirmation
pub const MATCH_FOUND_STATUS: &str = "A subscriber matching the address was found.";

/// Status line for a not_found result
pub const NOT_FOUND_STATUS: &str = "No subscriber matches this address.";

/// Status line for a successful dispatch
pub const SUCCESS_STATUS: &str = "Email sent successfully!";

/// Status line when the subscriber was found but the email could not be sent
pub const EMAIL_ERROR_STATUS: &str = "A subscriber was found, but sending the email failed.";

/// Actions a user can take from a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Capture,
    ManualEntry,
    Submit,
    Edit,
    Send,
    Restart,
}

impl Action {
    /// Command keyword understood by the session loop
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::ManualEntry => "manual",
            Self::Submit => "submit",
            Self::Edit => "edit",
            Self::Send => "send",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Subscriber details formatted for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberCard {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl From<&Subscriber> for SubscriberCard {
    fn from(subscriber: &Subscriber) -> Self {
        Self {
            name: subscriber.display_name().to_string(),
            email: subscriber.display_email().to_string(),
            address: subscriber.display_address().to_string(),
        }
    }
}

/// Everything a front-end needs to draw the current step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub phase: Phase,
    pub camera_visible: bool,
    /// Inline message rendered in the camera pane after a failed acquisition
    pub camera_diagnostic: Option<String>,
    pub loading: bool,
    pub manual_form_visible: bool,
    pub manual_input: String,
    pub status: Option<String>,
    pub notice: Option<Notice>,
    pub address: Option<String>,
    pub subscriber: Option<SubscriberCard>,
    pub preview: PreviewState,
    pub send_enabled: bool,
    pub actions: Vec<Action>,
}

impl View {
    /// Render a state. Every phase yields at least one action.
    pub fn render(state: &WorkflowState) -> Self {
        let phase = state.phase();
        let mut view = Self {
            phase,
            camera_visible: phase == Phase::CameraActive,
            camera_diagnostic: None,
            loading: phase == Phase::Capturing,
            manual_form_visible: phase == Phase::ManualEntry,
            manual_input: state.manual_input().to_string(),
            status: None,
            notice: state.notice().cloned(),
            address: None,
            subscriber: None,
            preview: PreviewState::Idle,
            send_enabled: false,
            actions: Vec::new(),
        };

        match phase {
            Phase::CameraActive => {
                view.camera_diagnostic = state.device_failure().map(str::to_string);
                if state.device_failure().is_none() && !state.is_capture_in_flight() {
                    view.actions.push(Action::Capture);
                }
                view.actions.push(Action::ManualEntry);
            }
            Phase::Capturing => {
                view.status = Some(
                    match state.processing() {
                        Some(SubmissionKind::Text) => PROCESSING_ADDRESS,
                        _ => PROCESSING_IMAGE,
                    }
                    .to_string(),
                );
                view.actions.push(Action::Restart);
            }
            Phase::ManualEntry => {
                view.actions.extend([Action::Submit, Action::Restart]);
            }
            Phase::Confirmation => {
                view.status = Some(MATCH_FOUND_STATUS.to_string());
                if let Some(result) = state.result() {
                    view.address = result.extracted_address.clone();
                    view.subscriber = result.subscriber.as_ref().map(SubscriberCard::from);
                }
                view.preview = state.preview().clone();
                view.send_enabled = !state.is_send_in_flight();
                if view.send_enabled {
                    view.actions.extend([Action::Send, Action::Edit]);
                }
                view.actions.push(Action::Restart);
            }
            Phase::Result => {
                Self::render_result(state, &mut view);
                view.actions.extend([Action::Restart, Action::ManualEntry]);
            }
        }

        view
    }

    fn render_result(state: &WorkflowState, view: &mut Self) {
        if let Some(message) = state.transport_error() {
            view.status = Some(format!("Error: {}", message));
            return;
        }
        let Some(result) = state.result() else {
            return;
        };

        if result.is_error() {
            let message = result
                .error
                .as_deref()
                .unwrap_or("The server reported an error.");
            view.status = Some(format!("Error: {}", message));
            return;
        }

        if result.status == ResultStatus::NotFound {
            view.status = Some(NOT_FOUND_STATUS.to_string());
            view.address = Some(result.display_address().to_string());
            return;
        }

        view.status = match result.status {
            ResultStatus::Success => Some(SUCCESS_STATUS.to_string()),
            ResultStatus::EmailError => Some(EMAIL_ERROR_STATUS.to_string()),
            _ => None,
        };
        view.address = result
            .extracted_address
            .clone()
            .filter(|a| !a.trim().is_empty());
        view.subscriber = result.subscriber.as_ref().map(SubscriberCard::from);
    }

    /// Whether an action is offered by this view
    pub fn offers(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}
