//! Command-line interface for tictacfish.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tictacfish::{BotDifficulty, CharacterTeam, GameMode};

/// Tic-tac-fish - play against bots or peers over an actor system
#[derive(Parser, Debug)]
#[command(name = "tictacfish")]
#[command(about = "Tic-tac-fish over a location-transparent actor system", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "tictacfish.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host bots for internet-mode players until interrupted
    Server {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Play a game from the terminal
    Play {
        /// Where the opponent comes from: offline, internet or local-network
        #[arg(short, long, default_value = "offline")]
        mode: GameMode,

        /// Team to play (defaults to the opponent of the configured bot team)
        #[arg(short, long)]
        team: Option<CharacterTeam>,

        /// Server host (internet) or listen host (local-network)
        #[arg(long)]
        host: Option<String>,

        /// Server port (internet) or listen port (local-network)
        #[arg(short, long)]
        port: Option<u16>,

        /// Peer to dial in local-network mode; may be repeated
        #[arg(long = "peer")]
        peers: Vec<String>,
    },

    /// Watch two in-process bots play one game
    Bots {
        /// Strength of the fish bot
        #[arg(long, default_value = "easy")]
        fish: BotDifficulty,

        /// Strength of the rodent bot
        #[arg(long, default_value = "easy")]
        rodents: BotDifficulty,
    },
}
