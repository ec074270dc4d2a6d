//! Tictacfish - unified CLI
//!
//! Runs the bot server, a terminal game in any of the three modes, or a
//! bot-versus-bot demo.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::io::BufRead;
use std::sync::Arc;
use tictacfish::{
    ActorIdentity, ActorSystem, BotPlayer, CharacterTeam, GameEvent, GameMode, GameResult,
    GameSession, HumanHandles, LocalHumanPlayer, SharedPlayer, SystemConfig, find_opponent,
    should_initiate,
};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tictacfish=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SystemConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Server { host, port } => run_server(override_address(config, host, port)).await,
        Command::Play {
            mode,
            team,
            host,
            port,
            peers,
        } => {
            let mut config = override_address(config, host, port);
            if !peers.is_empty() {
                config = config.with_peers(peers);
            }
            let team = team.unwrap_or_else(|| config.bot_team().opponent());
            run_play(config, mode, team).await
        }
        Command::Bots { fish, rodents } => run_bots(config, fish, rodents).await,
    }
}

fn override_address(config: SystemConfig, host: Option<String>, port: Option<u16>) -> SystemConfig {
    let host = host.unwrap_or_else(|| config.host().clone());
    let port = port.unwrap_or(*config.port());
    config.with_address(host, port)
}

/// Listening role: activates a bot for every bot identity a peer references.
#[instrument(skip(config))]
async fn run_server(config: SystemConfig) -> Result<()> {
    let system = ActorSystem::new(config.clone());
    system.install_bot_resolver(*config.bot_team(), *config.bot_difficulty());
    let local = system.listen(&config.address()).await?;
    info!(%local, team = %config.bot_team(), "Bot server running, Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!(peers = system.peer_count(), "Shutting down");
    Ok(())
}

#[instrument(skip(config))]
async fn run_play(config: SystemConfig, mode: GameMode, team: CharacterTeam) -> Result<()> {
    let system = ActorSystem::new(config.clone());
    let (human, handles) = LocalHumanPlayer::new(team);
    let HumanHandles {
        selections,
        mut opponent_moves,
    } = handles;
    let myself = system.spawn_player(Arc::new(human))?;
    let me = system.resolve(&myself).await?;
    println!("You are {} playing {}", myself.short(), team);

    std::thread::spawn(move || read_selections(selections));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(events_rx, myself));

    let outcome = match mode {
        GameMode::Offline => {
            let bot = BotPlayer::with_difficulty(
                ActorIdentity::bot_for(&myself),
                team.opponent(),
                *config.bot_difficulty(),
            );
            let opponent = system.spawn_player(Arc::new(bot))?;
            let opponent = system.resolve(&opponent).await?;
            session(&system, me, opponent, events_tx).run_driven(true).await?
        }
        GameMode::Internet => {
            let link = system.connect(&config.address()).await?;
            let opponent = ActorIdentity::bot_for(&myself).with_origin(link.peer());
            let opponent = system.resolve(&opponent).await?;
            session(&system, me, opponent, events_tx).run_driven(true).await?
        }
        GameMode::LocalNetwork => {
            system.listen(&config.address()).await?;
            for peer in config.peers() {
                if let Err(e) = system.connect(peer).await {
                    warn!(peer, error = %e, "Peer not reachable, waiting for it to dial in");
                }
            }
            system.check_in(myself, team.tag());
            println!("Waiting for a {} player...", team.opponent());
            let opponent = find_opponent(&system, myself, team.opponent()).await?;
            let move_first = should_initiate(&myself, &opponent);
            let opponent = system.resolve(&opponent).await?;
            session(&system, me, opponent, events_tx)
                .with_turn_timeout(config.call_timeout())
                .run_peer(&mut opponent_moves, move_first)
                .await?
        }
    };

    printer.await.context("Event printer failed")?;
    info!(moves = outcome.moves, rejected = outcome.rejected_updates, "Game finished");
    Ok(())
}

fn session(
    system: &ActorSystem,
    me: SharedPlayer,
    opponent: SharedPlayer,
    events: mpsc::UnboundedSender<GameEvent>,
) -> GameSession {
    GameSession::new(me, opponent)
        .with_events(events)
        .releasing(system.registry().clone())
}

/// Forwards board positions typed as 1-9 to the local player.
///
/// Runs on its own thread so a pending read never holds up process exit.
fn read_selections(selections: mpsc::UnboundedSender<usize>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        match line.trim().parse::<usize>() {
            Ok(n @ 1..=9) => {
                if selections.send(n - 1).is_err() {
                    break;
                }
            }
            _ => println!("Enter a position from 1 to 9"),
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<GameEvent>, myself: ActorIdentity) {
    while let Some(event) = events.recv().await {
        match event {
            GameEvent::MoveMade { mv, board } => {
                let who = if mv.player() == myself { "You" } else { "Opponent" };
                println!("\n{who} played {} at {}\n{board}", mv.character(), mv.position() + 1);
            }
            GameEvent::UpdateRejected { mv, reason } => {
                println!("Move at {} was rejected: {reason}", mv.position() + 1);
            }
            GameEvent::GameOver(GameResult::Win { winner, .. }) if winner == myself => {
                println!("\nYou win!");
            }
            GameEvent::GameOver(GameResult::Win { .. }) => println!("\nYou lose."),
            GameEvent::GameOver(GameResult::Draw) => println!("\nDraw."),
        }
    }
}

/// Two in-process bots play one game.
#[instrument(skip(config))]
async fn run_bots(
    config: SystemConfig,
    fish: tictacfish::BotDifficulty,
    rodents: tictacfish::BotDifficulty,
) -> Result<()> {
    let system = ActorSystem::new(config);
    let fish = system.spawn_player(Arc::new(BotPlayer::with_difficulty(
        ActorIdentity::random(),
        CharacterTeam::Fish,
        fish,
    )))?;
    let rodents = system.spawn_player(Arc::new(BotPlayer::with_difficulty(
        ActorIdentity::random(),
        CharacterTeam::Rodents,
        rodents,
    )))?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(events_rx, fish));
    let outcome = session(
        &system,
        system.resolve(&fish).await?,
        system.resolve(&rodents).await?,
        events_tx,
    )
    .run_driven(true)
    .await?;
    printer.await.context("Event printer failed")?;

    match outcome.result {
        GameResult::Win { winner, .. } if winner == fish => println!("Fish win in {} moves", outcome.moves),
        GameResult::Win { .. } => println!("Rodents win in {} moves", outcome.moves),
        GameResult::Draw => println!("Draw after {} moves", outcome.moves),
    }
    Ok(())
}
