use std::path::PathBuf;

use anyhow::{Result, bail};

/// External programs the full dubbing pipeline shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "uvx"];

#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: &'static str,
    pub location: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.location.is_some()
    }
}

pub fn check_tools(names: &[&'static str]) -> Vec<ToolStatus> {
    names
        .iter()
        .map(|name| ToolStatus {
            name,
            location: which::which(name).ok(),
        })
        .collect()
}

pub fn ensure_tools(names: &[&'static str]) -> Result<()> {
    let missing: Vec<&str> = check_tools(names)
        .into_iter()
        .filter(|status| !status.is_available())
        .map(|status| status.name)
        .collect();

    if !missing.is_empty() {
        bail!(
            "Required tool(s) not found on PATH: {}. Run `redub check` for details.",
            missing.join(", ")
        );
    }
    Ok(())
}
