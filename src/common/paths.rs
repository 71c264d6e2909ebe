use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for redub

/// Get the main redub config directory
pub fn redub_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("redub");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the directory that holds per-run workspaces when no root is configured
pub fn redub_workspace_root() -> Result<PathBuf> {
    let root = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("redub")
        .join("work");

    std::fs::create_dir_all(&root)
        .with_context(|| format!("creating workspace root at {}", root.display()))?;

    Ok(root)
}
