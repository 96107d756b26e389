//! Capture-to-confirmation workflow use case

use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::domain::capture::{Duration, JpegQuality, Surface};
use crate::domain::matching::{ExtractionResult, Subscriber};
use crate::domain::workflow::{
    InvalidStateTransition, ManualSubmission, Phase, RecognitionApplied, SubmissionKind, View,
    WorkflowState, SEND_FAILURE_MESSAGE,
};

use super::ports::{
    BackendGateway, CaptureDevice, CaptureError, DeviceFailure, DeviceOutcome, GatewayError,
};

/// Errors from the workflow use case
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),
}

/// Configuration for the workflow
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Surface the camera binds to
    pub surface: Surface,
    /// Snapshot compression quality
    pub quality: JpegQuality,
    /// Pause between a failed acquisition and the switch to manual entry
    pub fallback_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            surface: Surface::default(),
            quality: JpegQuality::default(),
            fallback_delay: Duration::default_fallback_delay(),
        }
    }
}

tokio::task_local! {
    /// Generation of the acquisition being polled on the current task
    static ACQUISITION: u64;
}

/// What a user action led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Another call of the same kind was outstanding; the trigger was ignored
    Dropped,
    /// Input failed validation; the phase did not change
    Rejected,
    /// The workflow moved to this phase
    Applied(Phase),
    /// The response arrived for an older generation and was discarded
    Stale,
}

/// Workflow controller.
///
/// Owns the workflow state and sequences device and backend calls. The state
/// lock is never held across a backend call.
pub struct WorkflowController<D, G>
where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    device: Arc<D>,
    gateway: Arc<G>,
    state: Arc<Mutex<WorkflowState>>,
    tasks: TaskTracker,
    config: WorkflowConfig,
}

impl<D, G> WorkflowController<D, G>
where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    /// Create a controller and subscribe to the device's failure notifications.
    ///
    /// The controller must be driven from a tokio runtime. The fallback to
    /// manual entry is scheduled on the runtime that polls the failed
    /// acquisition; without one the failure is only logged and the workflow
    /// stays on the camera, where the manual entry action remains offered.
    /// Failures a device raises outside `acquire` are ignored.
    pub fn new(device: D, gateway: G, config: WorkflowConfig) -> Self {
        let controller = Self {
            device: Arc::new(device),
            gateway: Arc::new(gateway),
            state: Arc::new(Mutex::new(WorkflowState::new())),
            tasks: TaskTracker::new(),
            config,
        };
        controller.listen_for_device_failures();
        controller
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn listen_for_device_failures(&self) {
        let state = Arc::clone(&self.state);
        let device: Weak<D> = Arc::downgrade(&self.device);
        let tasks = self.tasks.clone();
        let delay = self.config.fallback_delay;

        self.device.on_failure(Arc::new(move |failure: &DeviceFailure| {
            // Attributed to the acquisition that raised it, not the latest one
            let Ok(generation) = ACQUISITION.try_with(|generation| *generation) else {
                debug!(reason = %failure.message, "camera failure outside an acquisition, ignored");
                return;
            };
            warn!(generation, reason = %failure.message, "camera acquisition failed");

            let Ok(handle) = tokio::runtime::Handle::try_current() else {
                warn!(generation, "no async runtime available, camera fallback skipped");
                return;
            };

            let state = Arc::clone(&state);
            let device = device.clone();
            let message = failure.message.clone();
            tasks.spawn_on(
                async move {
                    {
                        let mut state = state.lock().await;
                        if !state.record_device_failure(generation, &message) {
                            debug!(generation, "ignoring failure from a superseded acquisition");
                            return;
                        }
                        // Under the lock: a restart cannot start a stream in between
                        if let Some(device) = device.upgrade() {
                            device.release().await;
                        }
                    }
                    tokio::time::sleep(delay.as_std()).await;
                    if state.lock().await.fall_back_to_manual(generation) {
                        info!(generation, "switched to manual entry after camera failure");
                    }
                },
                &handle,
            );
        }));
    }

    /// Current view of the workflow
    pub async fn view(&self) -> View {
        let mut view = View::render(&*self.state.lock().await);
        if view.camera_visible {
            if let Some(diagnostic) = self.device.diagnostic() {
                view.camera_diagnostic = Some(diagnostic);
            }
        }
        view
    }

    /// Copy of the current workflow state
    pub async fn snapshot(&self) -> WorkflowState {
        self.state.lock().await.clone()
    }

    /// Get current phase
    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    /// Wait until the fallback timer and preview fetches started so far have finished
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Enter the initial camera phase by acquiring the device
    pub async fn start(&self) -> Result<DeviceOutcome, WorkflowError> {
        let generation = {
            let state = self.state.lock().await;
            if state.phase() != Phase::CameraActive {
                return Err(InvalidStateTransition {
                    current_phase: state.phase(),
                    action: "start the camera".to_string(),
                }
                .into());
            }
            state.generation()
        };
        Ok(self.acquire_device(generation).await)
    }

    async fn acquire_device(&self, generation: u64) -> DeviceOutcome {
        let outcome = ACQUISITION
            .scope(generation, self.device.acquire(&self.config.surface))
            .await;

        match &outcome {
            DeviceOutcome::Ready => {
                let state = self.state.lock().await;
                if state.phase() != Phase::CameraActive {
                    // The user left the camera while it was starting up
                    debug!(generation, "camera ready after leaving camera phase, releasing");
                    self.device.release().await;
                } else {
                    info!(generation, surface = self.config.surface.id(), "camera ready");
                }
            }
            DeviceOutcome::Unavailable(reason) => {
                debug!(generation, %reason, "camera unavailable, fallback scheduled");
            }
        }
        outcome
    }

    /// Take a snapshot and submit it for recognition.
    ///
    /// A trigger while a capture is outstanding returns `Step::Dropped`.
    pub async fn capture(&self) -> Result<Step, WorkflowError> {
        let begun = self.state.lock().await.begin_capture()?;
        let Some(generation) = begun else {
            debug!("capture already in flight, trigger dropped");
            return Ok(Step::Dropped);
        };

        let image = match self.device.snapshot(self.config.quality).await {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "snapshot failed");
                self.state
                    .lock()
                    .await
                    .abort_capture(generation, &e.to_string());
                return Err(e.into());
            }
        };

        {
            let mut state = self.state.lock().await;
            if !state.enter_processing(generation, SubmissionKind::Image) {
                return Ok(Step::Stale);
            }
            // Closed under the lock so a concurrent restart keeps its fresh stream
            self.device.release().await;
        }

        debug!(generation, size = %image.human_readable_size(), "submitting snapshot");
        let response = self.gateway.recognize_image(&image).await;
        Ok(self
            .finish_recognition(generation, SubmissionKind::Image, response)
            .await)
    }

    /// Switch to the manual address form, releasing the camera
    pub async fn request_manual_entry(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.request_manual_entry()?;
        self.device.release().await;
        Ok(())
    }

    /// Put text into the manual form without submitting it, switching to
    /// manual entry first when coming from the camera or a result
    pub async fn prefill_manual(&self, text: &str) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        if state.phase() != Phase::ManualEntry {
            state.request_manual_entry()?;
            self.device.release().await;
        }
        state.fill_manual_input(text)?;
        Ok(())
    }

    /// Submit typed address text for recognition.
    ///
    /// Blank text is rejected locally without a backend call.
    pub async fn submit_manual(&self, text: &str) -> Result<Step, WorkflowError> {
        let submission = self.state.lock().await.begin_manual_submission(text)?;
        let (generation, address) = match submission {
            ManualSubmission::Dropped => {
                debug!("submission already in flight, trigger dropped");
                return Ok(Step::Dropped);
            }
            ManualSubmission::Rejected => {
                debug!("empty manual address rejected");
                return Ok(Step::Rejected);
            }
            ManualSubmission::Accepted { generation, text } => (generation, text),
        };

        debug!(generation, "submitting manual address");
        let response = self.gateway.recognize_text(&address).await;
        Ok(self
            .finish_recognition(generation, SubmissionKind::Text, response)
            .await)
    }

    async fn finish_recognition(
        &self,
        generation: u64,
        kind: SubmissionKind,
        response: Result<ExtractionResult, GatewayError>,
    ) -> Step {
        let mut state = self.state.lock().await;
        match response {
            Ok(result) => {
                let status = result.status;
                match state.apply_recognition(generation, result) {
                    RecognitionApplied::Stale => {
                        debug!(generation, %status, "discarding stale recognition response");
                        Step::Stale
                    }
                    RecognitionApplied::Confirmation(subscriber) => {
                        info!(generation, "subscriber match found");
                        self.fetch_preview(generation, subscriber);
                        Step::Applied(Phase::Confirmation)
                    }
                    RecognitionApplied::Result => {
                        info!(generation, %status, "recognition finished");
                        Step::Applied(Phase::Result)
                    }
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "recognition call failed");
                if state.fail_recognition(generation, kind.failure_message()) {
                    Step::Applied(Phase::Result)
                } else {
                    Step::Stale
                }
            }
        }
    }

    /// Fetch the email preview in the background; the transition does not wait for it
    fn fetch_preview(&self, generation: u64, subscriber: Subscriber) {
        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        self.tasks.spawn(async move {
            let preview = gateway.preview_email(&subscriber).await.map_err(|e| {
                warn!(generation, error = %e, "email preview failed");
                e.to_string()
            });
            if !state.lock().await.apply_preview(generation, preview) {
                debug!(generation, "discarding stale email preview");
            }
        });
    }

    /// Return from confirmation to the manual form, pre-filled with the recognized address
    pub async fn edit(&self) -> Result<(), WorkflowError> {
        self.state.lock().await.edit()?;
        Ok(())
    }

    /// Dispatch the notification email for the confirmed match.
    ///
    /// A transport failure keeps the workflow in confirmation with the send
    /// trigger re-enabled.
    pub async fn send(&self) -> Result<Step, WorkflowError> {
        let ticket = self.state.lock().await.begin_send()?;
        let Some(ticket) = ticket else {
            debug!("send already in flight, trigger dropped");
            return Ok(Step::Dropped);
        };

        info!(generation = ticket.generation, "sending notification email");
        let response = self
            .gateway
            .send_email(&ticket.subscriber, &ticket.extracted_address)
            .await;

        let mut state = self.state.lock().await;
        match response {
            Ok(mut result) => {
                if result.subscriber.is_none() {
                    result.subscriber = Some(ticket.subscriber);
                }
                if result.extracted_address.is_none() && !ticket.extracted_address.is_empty() {
                    result.extracted_address = Some(ticket.extracted_address);
                }
                let status = result.status;
                if state.apply_send(ticket.generation, result) {
                    info!(generation = ticket.generation, %status, "send finished");
                    Ok(Step::Applied(Phase::Result))
                } else {
                    debug!(generation = ticket.generation, "discarding stale send response");
                    Ok(Step::Stale)
                }
            }
            Err(e) => {
                warn!(generation = ticket.generation, error = %e, "send call failed");
                if state.fail_send(ticket.generation, SEND_FAILURE_MESSAGE) {
                    Ok(Step::Applied(Phase::Confirmation))
                } else {
                    Ok(Step::Stale)
                }
            }
        }
    }

    /// Clear everything and re-acquire the camera.
    ///
    /// Outstanding calls keep running; their responses are discarded.
    pub async fn restart(&self) -> DeviceOutcome {
        let generation = {
            let mut state = self.state.lock().await;
            let generation = state.restart();
            self.device.release().await;
            generation
        };
        info!(generation, "workflow restarted");
        self.acquire_device(generation).await
    }

    /// Release the camera, e.g. on shutdown
    pub async fn shutdown(&self) {
        self.device.release().await;
        self.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{FailureBroadcaster, FailureListener};
    use crate::domain::capture::{CapturedImage, ImageMimeType};
    use crate::domain::matching::{EmailPreview, ResultStatus};
    use crate::domain::workflow::{
        Action, PreviewState, CAMERA_FALLBACK_WARNING, VALIDATION_MESSAGE,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration as StdDuration;
    use tokio::sync::Notify;

    struct MockDevice {
        failure: Option<String>,
        /// The first acquisition waits for the gate, then fails with the reason
        stalled_first: Option<(Arc<Notify>, String)>,
        ready: AtomicBool,
        acquired: AtomicUsize,
        released: AtomicUsize,
        listeners: FailureBroadcaster,
    }

    impl MockDevice {
        fn working() -> Self {
            Self {
                failure: None,
                stalled_first: None,
                ready: AtomicBool::new(false),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                listeners: FailureBroadcaster::new(),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                failure: Some(reason.to_string()),
                ..Self::working()
            }
        }

        fn stalling_then_failing(gate: Arc<Notify>, reason: &str) -> Self {
            Self {
                stalled_first: Some((gate, reason.to_string())),
                ..Self::working()
            }
        }

        fn fail(&self, reason: &str) -> DeviceOutcome {
            self.listeners.notify(&DeviceFailure {
                message: reason.to_string(),
            });
            DeviceOutcome::Unavailable(reason.to_string())
        }
    }

    #[async_trait]
    impl CaptureDevice for MockDevice {
        async fn acquire(&self, _surface: &Surface) -> DeviceOutcome {
            let attempt = self.acquired.fetch_add(1, Ordering::SeqCst);
            if let (0, Some((gate, reason))) = (attempt, &self.stalled_first) {
                gate.notified().await;
                return self.fail(reason);
            }
            match &self.failure {
                Some(reason) => self.fail(reason),
                None => {
                    self.ready.store(true, Ordering::SeqCst);
                    DeviceOutcome::Ready
                }
            }
        }

        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn snapshot(&self, _quality: JpegQuality) -> Result<CapturedImage, CaptureError> {
            if !self.is_ready() {
                return Err(CaptureError::NotReady);
            }
            Ok(CapturedImage::new(vec![0xFF, 0xD8], ImageMimeType::Jpeg))
        }

        async fn release(&self) {
            self.ready.store(false, Ordering::SeqCst);
            self.released.fetch_add(1, Ordering::SeqCst);
        }

        fn on_failure(&self, listener: FailureListener) {
            self.listeners.subscribe(listener);
        }

        fn diagnostic(&self) -> Option<String> {
            None
        }
    }

    struct MockGateway {
        recognition: Result<ExtractionResult, GatewayError>,
        sending: Result<ExtractionResult, GatewayError>,
        gate: Option<Arc<Notify>>,
        recognize_calls: AtomicUsize,
        texts: StdMutex<Vec<String>>,
        previews: StdMutex<Vec<Subscriber>>,
        sends: AtomicUsize,
    }

    impl MockGateway {
        fn answering(recognition: Result<ExtractionResult, GatewayError>) -> Self {
            Self {
                recognition,
                sending: Ok(ExtractionResult::with_status(ResultStatus::Success)),
                gate: None,
                recognize_calls: AtomicUsize::new(0),
                texts: StdMutex::new(Vec::new()),
                previews: StdMutex::new(Vec::new()),
                sends: AtomicUsize::new(0),
            }
        }

        async fn respond(&self) -> Result<ExtractionResult, GatewayError> {
            self.recognize_calls.fetch_add(1, Ordering::SeqCst);
            match &self.gate {
                Some(gate) => gate.notified().await,
                None => tokio::task::yield_now().await,
            }
            self.recognition.clone()
        }
    }

    #[async_trait]
    impl BackendGateway for MockGateway {
        async fn recognize_image(
            &self,
            _image: &CapturedImage,
        ) -> Result<ExtractionResult, GatewayError> {
            self.respond().await
        }

        async fn recognize_text(&self, address: &str) -> Result<ExtractionResult, GatewayError> {
            self.texts.lock().unwrap().push(address.to_string());
            self.respond().await
        }

        async fn preview_email(
            &self,
            subscriber: &Subscriber,
        ) -> Result<EmailPreview, GatewayError> {
            self.previews.lock().unwrap().push(subscriber.clone());
            Ok(EmailPreview::new("<p>Hello</p>"))
        }

        async fn send_email(
            &self,
            _subscriber: &Subscriber,
            _extracted_address: &str,
        ) -> Result<ExtractionResult, GatewayError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.sending.clone()
        }
    }

    fn alice() -> Subscriber {
        Subscriber {
            name: Some("Alice".to_string()),
            email: Some("a@x.com".to_string()),
            address: Some("123 Main St".to_string()),
        }
    }

    fn match_found() -> ExtractionResult {
        ExtractionResult {
            extracted_address: Some("123 Main St".to_string()),
            subscriber: Some(alice()),
            ..ExtractionResult::with_status(ResultStatus::MatchFound)
        }
    }

    fn fast_config() -> WorkflowConfig {
        WorkflowConfig {
            fallback_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn controller(
        device: MockDevice,
        gateway: MockGateway,
    ) -> WorkflowController<MockDevice, MockGateway> {
        WorkflowController::new(device, gateway, fast_config())
    }

    async fn confirming() -> WorkflowController<MockDevice, MockGateway> {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();
        controller.capture().await.unwrap();
        controller.settle().await;
        controller
    }

    #[tokio::test]
    async fn start_acquires_camera() {
        let controller = controller(MockDevice::working(), MockGateway::answering(Ok(match_found())));
        let outcome = controller.start().await.unwrap();

        assert_eq!(outcome, DeviceOutcome::Ready);
        assert!(controller.device().is_ready());
        assert_eq!(controller.phase().await, Phase::CameraActive);
    }

    #[tokio::test]
    async fn capture_match_enters_confirmation_and_fetches_preview() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();

        let step = controller.capture().await.unwrap();
        assert_eq!(step, Step::Applied(Phase::Confirmation));
        // Camera is closed before leaving the camera phase
        assert!(!controller.device().is_ready());

        controller.settle().await;
        assert_eq!(*controller.gateway().previews.lock().unwrap(), vec![alice()]);
        let view = controller.view().await;
        assert_eq!(
            view.preview,
            PreviewState::Ready(EmailPreview::new("<p>Hello</p>"))
        );
    }

    #[tokio::test]
    async fn rapid_captures_issue_one_recognition_call() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();

        let (first, second) = tokio::join!(controller.capture(), controller.capture());

        assert_eq!(first.unwrap(), Step::Applied(Phase::Confirmation));
        assert_eq!(second.unwrap(), Step::Dropped);
        assert_eq!(controller.gateway().recognize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_before_ready_stays_on_camera() {
        let controller = controller(MockDevice::working(), MockGateway::answering(Ok(match_found())));
        // Never started, so the device is not ready

        let err = controller.capture().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Capture(CaptureError::NotReady)));

        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::CameraActive);
        assert!(!state.is_capture_in_flight());
        assert_eq!(controller.gateway().recognize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn device_failure_falls_back_to_manual_entry() {
        let controller = controller(
            MockDevice::failing("Permission denied"),
            MockGateway::answering(Ok(match_found())),
        );

        let outcome = controller.start().await.unwrap();
        assert_eq!(outcome, DeviceOutcome::Unavailable("Permission denied".to_string()));

        controller.settle().await;
        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::ManualEntry);
        assert!(state.notice().is_some());
        assert!(controller.device().released.load(Ordering::SeqCst) >= 1);
        assert_eq!(controller.device().acquired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_waits_for_the_configured_delay() {
        let controller = WorkflowController::new(
            MockDevice::failing("Permission denied"),
            MockGateway::answering(Ok(match_found())),
            WorkflowConfig::default(),
        );
        controller.start().await.unwrap();
        while controller.snapshot().await.device_failure().is_none() {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(StdDuration::from_millis(499)).await;
        let view = controller.view().await;
        assert_eq!(view.phase, Phase::CameraActive);
        assert_eq!(view.camera_diagnostic.as_deref(), Some("Permission denied"));
        assert!(view.offers(Action::ManualEntry));
        assert!(!view.offers(Action::Capture));

        tokio::time::advance(StdDuration::from_millis(1)).await;
        controller.settle().await;
        let view = controller.view().await;
        assert_eq!(view.phase, Phase::ManualEntry);
        assert_eq!(view.notice.unwrap().text, CAMERA_FALLBACK_WARNING);
    }

    #[tokio::test]
    async fn late_failure_of_superseded_acquisition_is_ignored() {
        let gate = Arc::new(Notify::new());
        let controller = Arc::new(controller(
            MockDevice::stalling_then_failing(Arc::clone(&gate), "Permission denied"),
            MockGateway::answering(Ok(match_found())),
        ));

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.start().await }
        });
        while controller.device().acquired.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.restart().await, DeviceOutcome::Ready);
        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(!outcome.is_ready());

        controller.settle().await;
        let view = controller.view().await;
        assert_eq!(view.phase, Phase::CameraActive);
        assert!(view.camera_diagnostic.is_none());
        assert!(view.offers(Action::Capture));
        assert!(controller.device().is_ready());
    }

    #[tokio::test]
    async fn failure_raised_outside_an_acquisition_is_ignored() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();

        controller.device().fail("stream lost");
        controller.settle().await;

        assert_eq!(controller.phase().await, Phase::CameraActive);
        assert!(controller.device().is_ready());
    }

    #[tokio::test]
    async fn empty_manual_submission_issues_no_call() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();
        controller.request_manual_entry().await.unwrap();

        let step = controller.submit_manual("   ").await.unwrap();

        assert_eq!(step, Step::Rejected);
        assert_eq!(controller.gateway().recognize_calls.load(Ordering::SeqCst), 0);
        let view = controller.view().await;
        assert_eq!(view.phase, Phase::ManualEntry);
        assert_eq!(view.notice.unwrap().text, VALIDATION_MESSAGE);
    }

    #[tokio::test]
    async fn manual_match_requests_preview_for_subscriber() {
        let controller = controller(MockDevice::working(), MockGateway::answering(Ok(match_found())));
        controller.request_manual_entry().await.unwrap();

        let step = controller.submit_manual("123 Main St").await.unwrap();
        assert_eq!(step, Step::Applied(Phase::Confirmation));
        assert_eq!(
            *controller.gateway().texts.lock().unwrap(),
            vec!["123 Main St".to_string()]
        );

        controller.settle().await;
        assert_eq!(*controller.gateway().previews.lock().unwrap(), vec![alice()]);
    }

    #[tokio::test]
    async fn prefill_switches_to_manual_entry() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Ok(match_found())),
        );
        controller.start().await.unwrap();

        controller.prefill_manual("9 Elm Rd").await.unwrap();

        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::ManualEntry);
        assert_eq!(state.manual_input(), "9 Elm Rd");
        assert!(!controller.device().is_ready());
        assert_eq!(controller.gateway().recognize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_lands_in_result() {
        let controller = controller(
            MockDevice::working(),
            MockGateway::answering(Err(GatewayError::RequestFailed("refused".to_string()))),
        );
        controller.start().await.unwrap();

        let step = controller.capture().await.unwrap();
        assert_eq!(step, Step::Applied(Phase::Result));
        let view = controller.view().await;
        assert!(view.status.unwrap().contains("processing the image"));
        assert!(!view.actions.is_empty());
    }

    #[tokio::test]
    async fn edit_prefills_manual_form() {
        let controller = confirming().await;
        controller.edit().await.unwrap();

        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::ManualEntry);
        assert_eq!(state.manual_input(), "123 Main St");
        assert_eq!(state.result().unwrap().subscriber, Some(alice()));
    }

    #[tokio::test]
    async fn send_success_fills_missing_fields() {
        let controller = confirming().await;

        let step = controller.send().await.unwrap();
        assert_eq!(step, Step::Applied(Phase::Result));

        let state = controller.snapshot().await;
        let result = state.result().unwrap();
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.subscriber, Some(alice()));
        assert_eq!(result.extracted_address.as_deref(), Some("123 Main St"));
    }

    #[tokio::test]
    async fn send_failure_stays_in_confirmation() {
        let mut gateway = MockGateway::answering(Ok(match_found()));
        gateway.sending = Err(GatewayError::RequestFailed("timeout".to_string()));
        let controller = controller(MockDevice::working(), gateway);
        controller.start().await.unwrap();
        controller.capture().await.unwrap();

        let step = controller.send().await.unwrap();
        assert_eq!(step, Step::Applied(Phase::Confirmation));

        let view = controller.view().await;
        assert!(view.send_enabled);
        assert_eq!(view.subscriber.unwrap().name, "Alice");
        assert_eq!(view.notice.unwrap().text, SEND_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn restart_discards_late_response() {
        let gate = Arc::new(Notify::new());
        let mut gateway = MockGateway::answering(Ok(match_found()));
        gateway.gate = Some(Arc::clone(&gate));
        let controller = Arc::new(controller(MockDevice::working(), gateway));
        controller.start().await.unwrap();

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.capture().await })
        };
        while controller.gateway().recognize_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        controller.restart().await;
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), Step::Stale);
        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::CameraActive);
        assert!(state.result().is_none());
        assert!(controller.device().is_ready());
        assert!(controller.gateway().previews.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn restart_clears_result_and_reacquires() {
        let controller = confirming().await;
        controller.edit().await.unwrap();

        let outcome = controller.restart().await;

        assert!(outcome.is_ready());
        let state = controller.snapshot().await;
        assert_eq!(state.phase(), Phase::CameraActive);
        assert!(state.result().is_none());
        assert!(state.manual_input().is_empty());
        assert!(state.notice().is_none());
        assert_eq!(controller.device().acquired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn start_outside_camera_phase_fails() {
        let controller = controller(MockDevice::working(), MockGateway::answering(Ok(match_found())));
        controller.request_manual_entry().await.unwrap();
        assert!(matches!(
            controller.start().await,
            Err(WorkflowError::InvalidState(_))
        ));
    }
}
