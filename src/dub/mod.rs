pub mod cli;
pub mod commands;
pub mod compose;
pub mod config;
pub mod error;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod reconcile;
pub mod rescale;
pub mod segment;
pub mod srt;
pub mod subtitles;
pub mod support;
pub mod synth;
pub mod transcribe;
pub mod workspace;

pub use cli::DubCommands;
pub use commands::handle_dub_command;
pub use config::DubConfig;
