mod common;
mod dub;
mod ui;

use clap::Parser;
use std::path::PathBuf;

use crate::common::config::DocumentedConfig;
use crate::dub::error::DubError;
use crate::dub::{DubCommands, DubConfig};
use crate::ui::prelude::*;

/// redub main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for events
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: DubCommands,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DubConfig> {
    match path {
        Some(path) => DubConfig::load_from_path_documented(path),
        None => DubConfig::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    let result = match load_config(cli.config.as_ref()) {
        Ok(config) => dub::handle_dub_command(cli.command, config).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        let code = match err.downcast_ref::<DubError>() {
            Some(dub_err) if dub_err.is_data_failure() => "redub.error.input",
            _ => "redub.error",
        };
        emit(Level::Error, code, &format!("Error: {err:#}"), None);
        std::process::exit(1);
    }
}
