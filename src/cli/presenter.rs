//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::workflow::{NoticeLevel, Phase, PreviewState, View, SUCCESS_STATUS};

/// Session help text
pub const SESSION_HELP: &str = "\
Commands:
  capture, c          Take a snapshot and look up the address
  manual, m           Type the address instead
  submit [text]       Submit the address form (in manual entry a bare line also submits)
  demo [n]            List sample addresses, or fill the form with sample n
  edit, e             Correct the recognized address
  send, s             Send the notification email
  preview, p          Show the email preview
  restart, r          Start over
  help                Show this help
  quit, q             Leave (Ctrl-C also works)";

/// How a rendered line should be styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Plain,
    Success,
    Warning,
    Error,
    Hint,
}

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print the session help
    pub fn help(&self) {
        println!("{}", SESSION_HELP);
    }

    /// Print the input prompt for a phase
    pub fn prompt(&self, phase: Phase) {
        let label = match phase {
            Phase::ManualEntry => "address",
            _ => "mail-match",
        };
        self.output_inline(&format!("{} ", format!("{}>", label).bold()));
    }

    /// Print the numbered demo addresses
    pub fn demo_list(&self, addresses: &[String]) {
        if addresses.is_empty() {
            self.info("No demo addresses configured (config set demo_addresses \"1 Main St;2 Elm Rd\")");
            return;
        }
        for (i, address) in addresses.iter().enumerate() {
            println!("  {}. {}", (i + 1).to_string().cyan(), address);
        }
    }

    /// Draw a view
    pub fn render(&self, view: &View) {
        println!();
        for (tone, line) in describe(view) {
            let styled = match tone {
                Tone::Heading => line.bold().cyan(),
                Tone::Plain => line.normal(),
                Tone::Success => line.green(),
                Tone::Warning => line.yellow(),
                Tone::Error => line.red(),
                Tone::Hint => line.dimmed(),
            };
            println!("{}", styled);
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lay a view out as styled text lines
pub fn describe(view: &View) -> Vec<(Tone, String)> {
    let mut lines = vec![(Tone::Heading, format!("[{}]", view.phase))];

    if view.camera_visible {
        match &view.camera_diagnostic {
            Some(diagnostic) => lines.push((Tone::Error, diagnostic.clone())),
            None => lines.push((
                Tone::Plain,
                "Camera is live. Point it at the envelope and capture.".to_string(),
            )),
        }
    }

    if let Some(status) = &view.status {
        let tone = if status.starts_with("Error:") {
            Tone::Error
        } else if status == SUCCESS_STATUS {
            Tone::Success
        } else {
            Tone::Plain
        };
        lines.push((tone, status.clone()));
    }

    if view.manual_form_visible {
        let contents = if view.manual_input.is_empty() {
            "(empty)"
        } else {
            view.manual_input.as_str()
        };
        lines.push((Tone::Plain, format!("Address form: {}", contents)));
    }

    if let Some(address) = &view.address {
        lines.push((Tone::Plain, format!("Address: {}", address)));
    }

    if let Some(card) = &view.subscriber {
        lines.push((Tone::Plain, format!("Name: {}", card.name)));
        lines.push((Tone::Plain, format!("Email: {}", card.email)));
        lines.push((Tone::Plain, format!("Subscriber address: {}", card.address)));
    }

    match &view.preview {
        PreviewState::Idle => {}
        PreviewState::Loading => {
            lines.push((Tone::Hint, "Email preview: loading...".to_string()))
        }
        PreviewState::Ready(_) => lines.push((
            Tone::Hint,
            "Email preview: ready (type 'preview')".to_string(),
        )),
        PreviewState::Failed(message) => lines.push((
            Tone::Warning,
            format!("Email preview unavailable: {}", message),
        )),
    }

    if let Some(notice) = &view.notice {
        let tone = match notice.level {
            NoticeLevel::Info => Tone::Plain,
            NoticeLevel::Warning => Tone::Warning,
            NoticeLevel::Error => Tone::Error,
        };
        lines.push((tone, notice.text.clone()));
    }

    if !view.actions.is_empty() {
        let actions: Vec<&str> = view.actions.iter().map(|a| a.command()).collect();
        lines.push((Tone::Hint, format!("Next: {}", actions.join(" | "))));
    }

    lines
}
