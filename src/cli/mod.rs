//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, session input
//! handling, and the interactive session runner.

pub mod app;
pub mod args;
pub mod commands;
pub mod config_cmd;
pub mod input;
pub mod presenter;

// Re-export commonly used types
pub use app::{run_session, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, SessionOptions};
pub use commands::SessionCommand;
pub use presenter::Presenter;
