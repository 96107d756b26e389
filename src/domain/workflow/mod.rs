//! Workflow domain module

mod state;
mod view;

pub use state::{
    InvalidStateTransition, ManualSubmission, Notice, NoticeLevel, Phase, PreviewState,
    RecognitionApplied, SendTicket, SubmissionKind, WorkflowState, CAMERA_FALLBACK_WARNING,
    IMAGE_FAILURE_MESSAGE, SEND_FAILURE_MESSAGE, TEXT_FAILURE_MESSAGE, VALIDATION_MESSAGE,
};
pub use view::{
    Action, SubscriberCard, View, EMAIL_ERROR_STATUS, MATCH_FOUND_STATUS, NOT_FOUND_STATUS,
    PROCESSING_ADDRESS, PROCESSING_IMAGE, SUCCESS_STATUS,
};
