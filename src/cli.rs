use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reqlog", version, about = "Request-scoped batching logger")]
pub struct Cli {
    /// Optional configuration file (REQLOG_* variables override it)
    #[arg(short, long, default_value = "reqlog.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the demo server with request logging and the ingest proxy route
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    /// Log one event through the configured transport and flush it
    Send {
        /// Event level (debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        level: String,

        /// Structured field as key=value (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Event message
        message: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the resolved configuration (token masked)
    Show,
    /// Validate configuration and print the delivery target
    Validate,
}
