//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::capture::{Duration, Facing, JpegQuality};
use crate::domain::config::{AppConfig, SurfaceConfig};
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CAMERA_MODES, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Separator for list values given on the command line
const LIST_SEPARATOR: char = ';';

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(invalid(
        key,
        format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    ))
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    validate_config_value(key, value)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

/// Write a validated value into the matching field
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "backend_url" => config.backend_url = Some(value.trim_end_matches('/').to_string()),
        "camera" => config.camera = Some(value.to_lowercase()),
        "camera_source" => config.camera_source = Some(value.to_string()),
        "facing" => config.facing = Some(value.to_lowercase()),
        "quality" => config.quality = Some(value.to_string()),
        "fallback_delay" => config.fallback_delay = Some(value.to_string()),
        "demo_addresses" => config.demo_addresses = Some(parse_list(value)),
        "surface.width" | "surface.height" => {
            let pixels = parse_pixels(key, value)?;
            let surface = config.surface.get_or_insert_with(SurfaceConfig::default);
            if key == "surface.width" {
                surface.width = Some(pixels);
            } else {
                surface.height = Some(pixels);
            }
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

/// Read a value as display text
fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "backend_url" => config.backend_url.clone(),
        "camera" => config.camera.clone(),
        "camera_source" => config.camera_source.clone(),
        "facing" => config.facing.clone(),
        "quality" => config.quality.clone(),
        "fallback_delay" => config.fallback_delay.clone(),
        "demo_addresses" => config
            .demo_addresses
            .as_ref()
            .map(|list| list.join(&format!("{} ", LIST_SEPARATOR))),
        "surface.width" => config
            .surface
            .as_ref()
            .and_then(|s| s.width)
            .map(|w| w.to_string()),
        "surface.height" => config
            .surface
            .as_ref()
            .and_then(|s| s.height)
            .map(|h| h.to_string()),
        _ => None,
    }
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;

    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            read_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate a config value based on key type
fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "backend_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(invalid(key, "Value must start with http:// or https://"));
            }
        }
        "camera" => {
            let lower = value.to_lowercase();
            if !VALID_CAMERA_MODES.contains(&lower.as_str()) {
                return Err(invalid(
                    key,
                    format!(
                        "Invalid value '{}'. Valid options: {}",
                        value,
                        VALID_CAMERA_MODES.join(", ")
                    ),
                ));
            }
        }
        "facing" => {
            value
                .parse::<Facing>()
                .map_err(|e| invalid(key, e.to_string()))?;
        }
        "quality" => {
            value
                .parse::<JpegQuality>()
                .map_err(|e| invalid(key, e.to_string()))?;
        }
        "fallback_delay" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(key, e.to_string()))?;
        }
        "demo_addresses" => {
            if parse_list(value).is_empty() {
                return Err(invalid(
                    key,
                    format!("Give at least one address, separated by '{}'", LIST_SEPARATOR),
                ));
            }
        }
        "surface.width" | "surface.height" => {
            parse_pixels(key, value)?;
        }
        _ => {} // camera_source accepts any path
    }
    Ok(())
}

/// Split a `;`-separated list, dropping blank items
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_pixels(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(pixels) if pixels > 0 => Ok(pixels),
        _ => Err(invalid(key, "Value must be a positive number of pixels")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_backend_url() {
        assert!(validate_config_value("backend_url", "http://localhost:5000").is_ok());
        assert!(validate_config_value("backend_url", "https://mail.example.org").is_ok());
        assert!(validate_config_value("backend_url", "localhost:5000").is_err());
    }

    #[test]
    fn validate_camera_mode() {
        assert!(validate_config_value("camera", "auto").is_ok());
        assert!(validate_config_value("camera", "NONE").is_ok());
        assert!(validate_config_value("camera", "webcam").is_err());
    }

    #[test]
    fn validate_typed_values() {
        assert!(validate_config_value("facing", "rear").is_ok());
        assert!(validate_config_value("facing", "sideways").is_err());
        assert!(validate_config_value("quality", "0.5").is_ok());
        assert!(validate_config_value("quality", "1.5").is_err());
        assert!(validate_config_value("fallback_delay", "750ms").is_ok());
        assert!(validate_config_value("fallback_delay", "soon").is_err());
        assert!(validate_config_value("surface.width", "1280").is_ok());
        assert!(validate_config_value("surface.height", "0").is_err());
    }

    #[test]
    fn parse_list_values() {
        assert_eq!(
            parse_list("123 Main St; 9 Elm Rd ;;"),
            vec!["123 Main St".to_string(), "9 Elm Rd".to_string()]
        );
        assert!(validate_config_value("demo_addresses", " ; ").is_err());
    }

    #[test]
    fn apply_surface_keys() {
        let mut config = AppConfig::empty();
        apply_value(&mut config, "surface.width", "1280").unwrap();
        apply_value(&mut config, "surface.height", "720").unwrap();

        assert_eq!(config.surface_or_default().width(), 1280);
        assert_eq!(config.surface_or_default().height(), 720);
        assert_eq!(read_value(&config, "surface.width").as_deref(), Some("1280"));
    }

    #[test]
    fn apply_and_read_demo_addresses() {
        let mut config = AppConfig::empty();
        apply_value(&mut config, "demo_addresses", "1 A St;2 B St").unwrap();
        assert_eq!(
            read_value(&config, "demo_addresses").as_deref(),
            Some("1 A St; 2 B St")
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = check_key("api_key").unwrap_err();
        assert!(err.to_string().contains("backend_url"));
    }
}
