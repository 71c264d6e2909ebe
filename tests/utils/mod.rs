use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn run_redub_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let config = env.config_path();
    let output = Command::new(env!("CARGO_BIN_EXE_redub"))
        .arg("--no-color")
        .arg("--config")
        .arg(&config)
        .args(args)
        .env("XDG_CONFIG_HOME", env.path().join("xdg-config"))
        .env("XDG_CACHE_HOME", env.path().join("xdg-cache"))
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Parse every stdout line as a JSON event
pub fn json_events(output: &CommandOutput) -> Vec<serde_json::Value> {
    output
        .stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}
