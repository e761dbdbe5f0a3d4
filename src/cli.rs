//! Command-line interface for peer_chess.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Peer Chess - two-player chess over a direct TCP connection
#[derive(Parser, Debug)]
#[command(name = "peer_chess")]
#[command(about = "Play chess against a peer over TCP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Path to the session config file (optional)
    #[arg(short, long, global = true, default_value = "peer_chess.toml")]
    pub config: PathBuf,

    /// Display name sent to the opponent
    #[arg(short, long, global = true)]
    pub name: Option<String>,

    /// Port to listen on or connect to
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Re-check every move the opponent reports
    #[arg(long, global = true)]
    pub verify_peer_moves: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for an opponent to connect and play White
    Host,

    /// Connect to a waiting host and play Black
    Join {
        /// Host name or IP address of the opponent
        address: String,
    },
}
