//! CLI argument definitions for podwarden-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Podwarden security-event response daemon.
///
/// Receives security-event webhooks and remediates matching workloads
/// by deleting the offending pod in the cluster.
#[derive(Parser, Debug)]
#[command(name = "podwarden-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to podwarden.toml configuration file.
    #[arg(short, long, default_value = "/etc/podwarden/podwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override webhook listen port (takes precedence over config file).
    #[arg(long)]
    pub port: Option<u16>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
