use std::path::PathBuf;

use clap::Parser;

/// Switchboard LLM gateway
#[derive(Debug, Parser)]
#[command(name = "switchboard", about = "Quota-aware LLM gateway with a realtime device hub")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchboard.toml", env = "SWITCHBOARD_CONFIG")]
    pub config: PathBuf,

    /// Log filter used when the environment does not set one
    #[arg(long, default_value = "info", env = "SWITCHBOARD_LOG")]
    pub log: String,
}
