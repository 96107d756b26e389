//! End-to-end workflow tests: frame-source camera and HTTP gateway against a mock backend

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mail_match::application::ports::{CaptureDevice, DeviceOutcome};
use mail_match::application::{Step, WorkflowConfig, WorkflowController};
use mail_match::domain::capture::{Duration, Facing};
use mail_match::domain::workflow::{
    Action, Phase, PreviewState, CAMERA_FALLBACK_WARNING, NOT_FOUND_STATUS, SUCCESS_STATUS,
    VALIDATION_MESSAGE,
};
use mail_match::infrastructure::{HttpGateway, StillImageDevice};

fn write_frame(dir: &Path) {
    image::RgbImage::from_pixel(32, 24, image::Rgb([200, 180, 160]))
        .save(dir.join("frame.png"))
        .unwrap();
}

fn fallback_after(ms: u64) -> WorkflowConfig {
    WorkflowConfig {
        fallback_delay: Duration::from_millis(ms),
        ..WorkflowConfig::default()
    }
}

async fn mount_match(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "match_found",
            "extracted_address": "123 Main St",
            "subscriber": {"name": "Alice", "email": "a@x.com", "address": "123 Main St"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn capture_confirm_and_send() {
    let frames = TempDir::new().unwrap();
    write_frame(frames.path());

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process-image"))
        .and(body_string_contains("data:image/jpeg;base64,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "match_found",
            "extracted_address": "123 Main St",
            "subscriber": {"name": "Alice", "email": "a@x.com", "address": "123 Main St"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/preview-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "email_html": "<p>Dear Alice</p>"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send-email"))
        .and(body_json(json!({
            "subscriber": {"name": "Alice", "email": "a@x.com", "address": "123 Main St"},
            "extracted_address": "123 Main St"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let controller = WorkflowController::new(
        StillImageDevice::new(frames.path(), Facing::Environment),
        HttpGateway::new(server.uri()),
        WorkflowConfig::default(),
    );

    assert_eq!(controller.start().await.unwrap(), DeviceOutcome::Ready);
    let view = controller.view().await;
    assert!(view.camera_visible);
    assert!(view.offers(Action::Capture));

    let step = controller.capture().await.unwrap();
    assert_eq!(step, Step::Applied(Phase::Confirmation));

    controller.settle().await;
    let view = controller.view().await;
    assert_eq!(view.address.as_deref(), Some("123 Main St"));
    assert_eq!(view.subscriber.as_ref().unwrap().name, "Alice");
    match &view.preview {
        PreviewState::Ready(preview) => assert_eq!(preview.html(), "<p>Dear Alice</p>"),
        other => panic!("expected a preview, got {:?}", other),
    }

    let step = controller.send().await.unwrap();
    assert_eq!(step, Step::Applied(Phase::Result));

    let view = controller.view().await;
    assert_eq!(view.status.as_deref(), Some(SUCCESS_STATUS));
    assert_eq!(view.subscriber.as_ref().unwrap().email, "a@x.com");
    assert!(view.offers(Action::Restart));

    controller.shutdown().await;
}

#[tokio::test]
async fn missing_camera_falls_back_to_manual_entry() {
    let empty = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/manual-entry"))
        .and(body_json(json!({"address": "9 Elm Rd"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "not_found",
            "provided_address": "9 Elm Rd"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = WorkflowController::new(
        StillImageDevice::new(empty.path(), Facing::Environment),
        HttpGateway::new(server.uri()),
        fallback_after(50),
    );

    let outcome = controller.start().await.unwrap();
    assert!(matches!(outcome, DeviceOutcome::Unavailable(_)));
    let view = controller.view().await;
    assert!(view
        .camera_diagnostic
        .as_deref()
        .unwrap()
        .starts_with("Error accessing camera"));

    controller.settle().await;
    let view = controller.view().await;
    assert_eq!(view.phase, Phase::ManualEntry);
    assert_eq!(view.notice.unwrap().text, CAMERA_FALLBACK_WARNING);

    // Blank input never reaches the backend
    assert_eq!(controller.submit_manual("   ").await.unwrap(), Step::Rejected);
    assert_eq!(
        controller.view().await.notice.unwrap().text,
        VALIDATION_MESSAGE
    );

    let step = controller.submit_manual("9 Elm Rd").await.unwrap();
    assert_eq!(step, Step::Applied(Phase::Result));
    let view = controller.view().await;
    assert_eq!(view.status.as_deref(), Some(NOT_FOUND_STATUS));
    assert_eq!(view.address.as_deref(), Some("9 Elm Rd"));
}

#[tokio::test]
async fn backend_error_message_is_shown_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/manual-entry"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Database unavailable"})),
        )
        .mount(&server)
        .await;

    let empty = TempDir::new().unwrap();
    let controller = WorkflowController::new(
        StillImageDevice::new(empty.path().join("missing.png"), Facing::User),
        HttpGateway::new(server.uri()),
        fallback_after(0),
    );
    controller.start().await.unwrap();
    controller.settle().await;

    controller.submit_manual("123 Main St").await.unwrap();
    let view = controller.view().await;
    assert_eq!(view.phase, Phase::Result);
    assert_eq!(view.status.as_deref(), Some("Error: Database unavailable"));
}

#[tokio::test]
async fn edit_then_resubmit_and_restart() {
    let frames = TempDir::new().unwrap();
    write_frame(frames.path());

    let server = MockServer::start().await;
    mount_match(&server, "/manual-entry").await;
    Mock::given(method("POST"))
        .and(path("/preview-email"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let controller = WorkflowController::new(
        StillImageDevice::new(frames.path(), Facing::Environment),
        HttpGateway::new(server.uri()),
        WorkflowConfig::default(),
    );
    controller.start().await.unwrap();

    controller.request_manual_entry().await.unwrap();
    assert!(!controller.device().is_ready());

    let step = controller.submit_manual("123 Main Street").await.unwrap();
    assert_eq!(step, Step::Applied(Phase::Confirmation));

    controller.settle().await;
    assert!(matches!(
        controller.view().await.preview,
        PreviewState::Failed(_)
    ));

    controller.edit().await.unwrap();
    let view = controller.view().await;
    assert_eq!(view.phase, Phase::ManualEntry);
    assert_eq!(view.manual_input, "123 Main St");

    assert_eq!(controller.restart().await, DeviceOutcome::Ready);
    let view = controller.view().await;
    assert_eq!(view.phase, Phase::CameraActive);
    assert!(view.manual_input.is_empty());
    assert!(controller.device().is_ready());
}
