//! Startup configuration document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use stylecast_model::CheckpointPaths;

/// Declarative startup document, loaded once before serving begins.
#[derive(Debug, Clone, Deserialize)]
pub struct StyleConfig {
    /// Style image paths to pre-encode on every configured device.
    pub styles: Vec<PathBuf>,
    /// Stage checkpoint locations; defaults to `model_checkpoints/`.
    #[serde(default)]
    pub checkpoints: CheckpointPaths,
}

pub fn load_config(path: &Path) -> Result<StyleConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to load style config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse style config file: {}", path.display()))
}
