//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "naptime")]
#[command(about = "A state-managed HTTP service that pauses a web media player after a sleep timer")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Web origin the player lives on
    #[arg(long, default_value = "https://open.spotify.com")]
    pub player_origin: String,

    /// Path of the persisted timer record
    #[arg(long, default_value = "naptime-timer.json")]
    pub state_file: PathBuf,

    /// Handle advertised for the locally attached player session
    #[arg(long, default_value = "local")]
    pub target: String,

    /// Smallest schedulable wake-up delay in milliseconds
    #[arg(long, default_value = "60")]
    pub min_delay_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
