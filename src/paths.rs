//! Centralized path resolution for ccsync
//!
//! # Environment Variables
//!
//! - `CCSYNC_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/ccsync`)
//! - `CCSYNC_STATE_DIR` - Override state directory (holds the watermark)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CCSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/ccsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\ccsync`
//!    - macOS/Linux: `~/.config/ccsync`
//!
//! For state_dir():
//! 1. `CCSYNC_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/ccsync` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\ccsync`
//!    - macOS/Linux: `~/.local/state/ccsync`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CCSYNC_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "CCSYNC_STATE_DIR";

const APP_DIR: &str = "ccsync";

/// Name of the config file inside [`config_dir`]
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the watermark file inside [`state_dir`]
pub const WATERMARK_FILE: &str = "last_run.json";

/// Get the ccsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the ccsync state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_DIR);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Default watermark file path
pub fn watermark_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(WATERMARK_FILE))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
