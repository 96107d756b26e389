//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::capture::{Duration, Facing, JpegQuality, Surface};

/// MailMatch - returned-mail address capture and subscriber notification
#[derive(Parser, Debug)]
#[command(name = "mail-match")]
#[command(version)]
#[command(
    about = "Capture a returned envelope, match its address to a subscriber and send a notification"
)]
#[command(long_about = None)]
pub struct Cli {
    /// Backend base URL (e.g., http://127.0.0.1:5000)
    #[arg(short = 'b', long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Image file or directory of frames used as the camera feed
    #[arg(short = 's', long, value_name = "PATH", conflicts_with = "no_camera")]
    pub source: Option<PathBuf>,

    /// Start without a camera and go straight to manual entry
    #[arg(long)]
    pub no_camera: bool,

    /// Preferred camera
    #[arg(short = 'f', long, value_name = "FACING")]
    pub facing: Option<FacingArg>,

    /// Snapshot JPEG quality, greater than 0 and at most 1 (e.g., 0.9)
    #[arg(short = 'q', long, value_name = "QUALITY")]
    pub quality: Option<String>,

    /// Pause before switching to manual entry when the camera fails (e.g., 500ms, 1s)
    #[arg(long, value_name = "TIME")]
    pub fallback_delay: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Facing argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FacingArg {
    #[value(alias = "rear", alias = "back")]
    Environment,
    #[value(alias = "front")]
    User,
}

impl From<FacingArg> for Facing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Environment => Facing::Environment,
            FacingArg::User => Facing::User,
        }
    }
}

/// Parsed session options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub backend_url: String,
    pub camera_source: Option<PathBuf>,
    pub camera_disabled: bool,
    pub facing: Facing,
    pub quality: JpegQuality,
    pub fallback_delay: Duration,
    pub surface: Surface,
    pub demo_addresses: Vec<String>,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "backend_url",
    "camera",
    "camera_source",
    "facing",
    "quality",
    "fallback_delay",
    "demo_addresses",
    "surface.width",
    "surface.height",
];

/// Valid values for the `camera` key
pub const VALID_CAMERA_MODES: &[&str] = &["auto", "none"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
