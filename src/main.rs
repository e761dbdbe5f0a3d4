//! Peer Chess - command-line entry point
//!
//! Hosts or joins a game, then plays it on the terminal.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use peer_chess::{
    Color, ConsoleView, GameSession, PeerChannel, PeerMoveGuard, Role, SessionConfig, TrustPeer,
    VerifyPeer, console, runtime,
};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = SessionConfig::load_or_default(&cli.config)?.with_overrides(
        cli.name,
        cli.port,
        cli.verify_peer_moves,
    )?;
    init_tracing(&config)?;

    let role = match cli.command {
        Command::Host => Role::Host,
        Command::Join { address } => Role::Join(address),
    };
    play(role, config).await
}

/// Logs go to a file so they do not interleave with the board.
fn init_tracing(config: &SessionConfig) -> Result<()> {
    let log_file = std::fs::File::create(config.log_file())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,peer_chess=debug")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Connects to the peer and runs one session until quit.
#[instrument(skip(config))]
async fn play(role: Role, config: SessionConfig) -> Result<()> {
    let color = role.color();
    match &role {
        Role::Host => println!("Waiting for an opponent on port {}...", config.port()),
        Role::Join(address) => println!("Connecting to {address}:{}...", config.port()),
    }
    let channel = PeerChannel::establish(&role, *config.port()).await?;
    println!("Connected to {}. You play {color}.", channel.peer_addr());
    info!(peer = %channel.peer_addr(), %color, "Peer channel ready");

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let guard: Box<dyn PeerMoveGuard> = if *config.verify_peer_moves() {
        Box::new(VerifyPeer)
    } else {
        Box::new(TrustPeer)
    };
    let mut session = GameSession::new(color, config.display_name(color), outbound_tx)
        .with_clock_budget(*config.clock_budget())
        .with_guard(guard);
    session.announce();

    let (sender, receiver) = channel.split();
    let reader = runtime::spawn_reader(receiver, command_tx.clone());
    let writer = runtime::spawn_writer(sender, outbound_rx, command_tx.clone());
    let clock = runtime::spawn_clock(config.tick_interval(), command_tx.clone());
    let input = console::spawn_input(command_tx);

    let mut view = ConsoleView;
    let session = runtime::run(session, command_rx, &mut view).await;
    info!(
        white = session.score(Color::White),
        black = session.score(Color::Black),
        "Session finished"
    );

    clock.abort();
    reader.abort();
    input.abort();
    // Dropping the session closes the outbound queue; let queued frames flush.
    drop(session);
    let _ = writer.await;
    Ok(())
}
