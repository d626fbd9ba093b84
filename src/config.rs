//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "lapwatchd")]
#[command(about = "A suspension-tolerant stopwatch and countdown timer daemon")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File the timer snapshot is restored from on startup and saved to on shutdown
    #[arg(short, long)]
    pub state_file: Option<PathBuf>,

    /// Disable host sleep detection
    #[arg(long)]
    pub no_wake_recovery: bool,

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
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["lapwatchd"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.log_level(), "info");
        assert!(config.state_file.is_none());
    }

    #[test]
    fn state_file_and_verbose() {
        let config =
            Config::try_parse_from(["lapwatchd", "-v", "--state-file", "/tmp/timer.json"]).unwrap();
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.state_file, Some(PathBuf::from("/tmp/timer.json")));
    }
}
