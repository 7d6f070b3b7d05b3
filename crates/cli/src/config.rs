//! CLI configuration utilities

use anyhow::{Context, Result};
use hrdesk_core::Settings;
use std::path::{Path, PathBuf};

/// Load settings from `path` (if any) and the environment. `--state-dir`
/// wins over both.
pub fn load_settings(path: Option<&Path>, state_dir: Option<PathBuf>) -> Result<Settings> {
    let mut settings = Settings::load(path).with_context(|| match path {
        Some(path) => format!("failed to load settings from {}", path.display()),
        None => "failed to load settings".to_string(),
    })?;

    if let Some(dir) = state_dir {
        settings.storage.state_dir = dir;
    }

    Ok(settings)
}
