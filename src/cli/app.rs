//! Interactive session runner

use std::collections::VecDeque;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::application::ports::{BackendGateway, CaptureDevice, ConfigStore, DeviceOutcome};
use crate::application::{Step, WorkflowConfig, WorkflowController, WorkflowError};
use crate::domain::capture::{Duration, Facing, JpegQuality};
use crate::domain::config::AppConfig;
use crate::domain::workflow::{Phase, PreviewState, PROCESSING_ADDRESS, PROCESSING_IMAGE};
use crate::infrastructure::{HttpGateway, StillImageDevice, UnavailableDevice, XdgConfigStore};

use super::args::SessionOptions;
use super::commands::{CommandError, SessionCommand};
use super::input::SessionInput;
use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "MAIL_MATCH_BACKEND_URL";

/// Whether the session keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run the interactive capture session
pub async fn run_session(options: SessionOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let controller = Arc::new(WorkflowController::new(
        build_device(&options),
        HttpGateway::new(&options.backend_url),
        WorkflowConfig {
            surface: options.surface.clone(),
            quality: options.quality,
            fallback_delay: options.fallback_delay,
        },
    ));
    let mut input = SessionInput::new();

    presenter.info(&format!(
        "Backend: {} | type 'help' for commands",
        options.backend_url
    ));

    match controller.start().await {
        Ok(outcome) => report_outcome(&controller, &presenter, outcome).await,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    }
    presenter.render(&controller.view().await);

    session_loop(
        &controller,
        &mut input,
        &mut presenter,
        &options.demo_addresses,
    )
    .await;

    presenter.stop_spinner();
    controller.shutdown().await;
    info!("session ended");
    ExitCode::from(EXIT_SUCCESS)
}

/// Pick the capture device for the configured camera mode
fn build_device(options: &SessionOptions) -> Box<dyn CaptureDevice> {
    if options.camera_disabled {
        return Box::new(UnavailableDevice::new("camera disabled"));
    }
    match &options.camera_source {
        Some(source) => Box::new(StillImageDevice::new(source, options.facing)),
        None => Box::new(UnavailableDevice::default()),
    }
}

/// Show the acquisition outcome; after a failure, show the diagnostic and
/// wait for the fallback to manual entry
async fn report_outcome<D, G>(
    controller: &WorkflowController<D, G>,
    presenter: &Presenter,
    outcome: DeviceOutcome,
) where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    match outcome {
        DeviceOutcome::Ready => presenter.success("Camera ready"),
        DeviceOutcome::Unavailable(reason) => {
            debug!(%reason, "camera unavailable");
            presenter.render(&controller.view().await);
            controller.settle().await;
        }
    }
}

/// Backend calls still running for the session
type PendingCalls = JoinSet<Result<Step, WorkflowError>>;

/// Read commands while backend calls run in the background.
///
/// Commands queue up behind an outstanding call and run in order once it
/// finishes. `restart` jumps the queue: it abandons the outstanding call and
/// whatever was queued behind it.
async fn session_loop<D, G>(
    controller: &Arc<WorkflowController<D, G>>,
    input: &mut SessionInput,
    presenter: &mut Presenter,
    demos: &[String],
) where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    let shutdown = input.shutdown();
    let mut pending = PendingCalls::new();
    let mut queued: VecDeque<SessionCommand> = VecDeque::new();
    let mut input_open = true;

    'session: loop {
        while pending.is_empty() {
            let Some(command) = queued.pop_front() else {
                break;
            };
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break 'session,
                outcome = run_command(controller, command, presenter, demos, &mut pending) => outcome,
            };
            match outcome {
                Ok(Flow::Quit) => break 'session,
                Ok(Flow::Continue) => {}
                Err(e) => report_refusal(presenter, &e),
            }
        }

        if pending.is_empty() {
            if !input_open {
                break;
            }
            presenter.prompt(controller.phase().await);
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = input.next_line(), if input_open => match line {
                Some(line) => match parse_line(&line, presenter) {
                    Some(SessionCommand::Restart) => {
                        if !pending.is_empty() {
                            info!("restart requested, abandoning the outstanding call");
                        }
                        pending.shutdown().await;
                        queued.clear();
                        presenter.stop_spinner();
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = restart(controller, presenter) => {}
                        }
                    }
                    Some(command) => queued.push_back(command),
                    None => {}
                },
                None => input_open = false,
            },
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                presenter.stop_spinner();
                match joined {
                    Ok(Ok(step)) => {
                        report_step(presenter, step);
                        presenter.render(&controller.view().await);
                    }
                    Ok(Err(e)) => report_refusal(presenter, &e),
                    Err(e) => {
                        warn!(error = %e, "backend call aborted");
                        presenter.error(&e.to_string());
                    }
                }
            }
        }
    }

    pending.shutdown().await;
}

/// Parse a typed line, reporting anything unrecognized
fn parse_line(line: &str, presenter: &Presenter) -> Option<SessionCommand> {
    match line.parse::<SessionCommand>() {
        Ok(command) => {
            debug!(?command, "session command");
            Some(command)
        }
        Err(CommandError::Empty) => None,
        Err(e) => {
            presenter.error(&e.to_string());
            None
        }
    }
}

fn report_refusal(presenter: &Presenter, error: &WorkflowError) {
    warn!(error = %error, "command refused");
    presenter.error(&error.to_string());
}

async fn restart<D, G>(controller: &WorkflowController<D, G>, presenter: &Presenter)
where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    let outcome = controller.restart().await;
    report_outcome(controller, presenter, outcome).await;
    presenter.render(&controller.view().await);
}

/// Run one command. Backend calls are started in `pending` and reported
/// when they finish; everything else redraws right away.
async fn run_command<D, G>(
    controller: &Arc<WorkflowController<D, G>>,
    command: SessionCommand,
    presenter: &mut Presenter,
    demos: &[String],
    pending: &mut PendingCalls,
) -> Result<Flow, WorkflowError>
where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    match command {
        SessionCommand::Quit => return Ok(Flow::Quit),
        SessionCommand::Help => {
            presenter.help();
            return Ok(Flow::Continue);
        }
        SessionCommand::Preview => {
            show_preview(controller, presenter).await;
            return Ok(Flow::Continue);
        }
        SessionCommand::Demo(None) => {
            presenter.demo_list(demos);
            return Ok(Flow::Continue);
        }
        SessionCommand::Demo(Some(n)) => match demos.get(n - 1) {
            Some(address) => controller.prefill_manual(address).await?,
            None => {
                presenter.error(&format!("No demo address {}", n));
                return Ok(Flow::Continue);
            }
        },
        SessionCommand::Capture => {
            presenter.start_spinner(PROCESSING_IMAGE);
            let controller = Arc::clone(controller);
            pending.spawn(async move { controller.capture().await });
            return Ok(Flow::Continue);
        }
        SessionCommand::Manual => controller.request_manual_entry().await?,
        SessionCommand::Submit(text) => {
            submit(controller, presenter, text, pending).await;
            return Ok(Flow::Continue);
        }
        SessionCommand::Text(text) => {
            if controller.phase().await != Phase::ManualEntry {
                presenter.error(&format!("Unknown command '{}'. Type 'help'", text));
                return Ok(Flow::Continue);
            }
            submit(controller, presenter, Some(text), pending).await;
            return Ok(Flow::Continue);
        }
        SessionCommand::Edit => controller.edit().await?,
        SessionCommand::Send => {
            presenter.start_spinner("Sending email...");
            let controller = Arc::clone(controller);
            pending.spawn(async move { controller.send().await });
            return Ok(Flow::Continue);
        }
        SessionCommand::Restart => {
            restart(controller, presenter).await;
            return Ok(Flow::Continue);
        }
    }

    presenter.render(&controller.view().await);
    Ok(Flow::Continue)
}

async fn submit<D, G>(
    controller: &Arc<WorkflowController<D, G>>,
    presenter: &mut Presenter,
    text: Option<String>,
    pending: &mut PendingCalls,
) where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    let text = match text {
        Some(text) => text,
        None => controller.snapshot().await.manual_input().to_string(),
    };
    presenter.start_spinner(PROCESSING_ADDRESS);
    let controller = Arc::clone(controller);
    pending.spawn(async move { controller.submit_manual(&text).await });
}

fn report_step(presenter: &mut Presenter, step: Step) {
    presenter.stop_spinner();
    match step {
        Step::Dropped => presenter.info("Still processing the previous request"),
        Step::Stale => debug!("response arrived after a restart and was discarded"),
        Step::Rejected | Step::Applied(_) => {}
    }
}

async fn show_preview<D, G>(controller: &WorkflowController<D, G>, presenter: &Presenter)
where
    D: CaptureDevice + 'static,
    G: BackendGateway + 'static,
{
    match controller.view().await.preview {
        PreviewState::Ready(preview) => presenter.output(preview.html()),
        PreviewState::Loading => presenter.info("The email preview is still loading"),
        PreviewState::Failed(message) => {
            presenter.warn(&format!("Email preview unavailable: {}", message))
        }
        PreviewState::Idle => presenter.info("No email preview outside confirmation"),
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        warn!(error = %e, path = %store.path().display(), "ignoring unreadable config file");
        AppConfig::empty()
    });

    // Build env config
    let env_config = AppConfig {
        backend_url: env::var(BACKEND_URL_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

/// Turn the merged configuration into session options.
///
/// Values that came from the command line or the config file must parse;
/// bad ones are reported instead of silently replaced by defaults.
pub fn resolve_options(config: &AppConfig) -> Result<SessionOptions, String> {
    let quality = match config.quality.as_deref() {
        Some(s) => s
            .parse::<JpegQuality>()
            .map_err(|e| format!("Invalid quality: {}", e))?,
        None => JpegQuality::default(),
    };
    let fallback_delay = match config.fallback_delay.as_deref() {
        Some(s) => s
            .parse::<Duration>()
            .map_err(|e| format!("Invalid fallback delay: {}", e))?,
        None => Duration::default_fallback_delay(),
    };
    if let Some(facing) = config.facing.as_deref() {
        facing
            .parse::<Facing>()
            .map_err(|e| format!("Invalid facing: {}", e))?;
    }

    Ok(SessionOptions {
        backend_url: config.backend_url_or_default().to_string(),
        camera_source: config.camera_source_path(),
        camera_disabled: config.camera_disabled(),
        facing: config.facing_or_default(),
        quality,
        fallback_delay,
        surface: config.surface_or_default(),
        demo_addresses: config.demo_addresses_or_default().to_vec(),
    })
}
