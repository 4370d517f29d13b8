//! CLI command definitions for the `parley` binary.

pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Real-time multilingual chat server.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and WebSocket server.
    Serve {
        /// Port to listen on (defaults to `server.port` in config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` in config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Show configuration and storage counters.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity. `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn,parley_api=info",
            1 => "info,parley_core=debug,parley_infra=debug,parley_api=debug",
            _ => "trace",
        }
    }
}
