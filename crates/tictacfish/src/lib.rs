//! Tic-tac-fish over a location-transparent actor system.
//!
//! Game participants are addressed by [`ActorIdentity`] whether they live in
//! this process or on a peer. The layers, bottom to top:
//!
//! - **Transport**: length-delimited frames over a long-lived connection
//! - **Remote calls**: request/response correlation with timeouts on a [`PeerLink`]
//! - **Registry**: identity to participant table with single on-demand activation
//! - **Receptionist**: tag-based discovery with snapshot plus live updates
//! - **Players**: local human, bot and remote proxy behind one [`GamePlayer`] trait
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tictacfish::{ActorSystem, BotPlayer, GameSession, SystemConfig};
//! use tictacfish_game::CharacterTeam;
//!
//! # async fn example() -> Result<(), tictacfish::ActorError> {
//! let system = ActorSystem::new(SystemConfig::default());
//! let fish = system.spawn_player(Arc::new(BotPlayer::random(CharacterTeam::Fish)))?;
//! let rodents = system.spawn_player(Arc::new(BotPlayer::random(CharacterTeam::Rodents)))?;
//!
//! let session = GameSession::new(system.resolve(&fish).await?, system.resolve(&rodents).await?);
//! let outcome = session.run_driven(true).await?;
//! println!("{:?} after {} moves", outcome.result, outcome.moves);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod envelope;
mod error;
mod matchmaking;
mod players;
mod receptionist;
mod registry;
mod rpc;
mod session;
mod system;
mod transport;

pub use config::{ConfigError, SystemConfig};
pub use envelope::{CallId, CallOutcome, Envelope, EnvelopeKind, ListingArgs, Method, PROTOCOL_VERSION};
pub use error::{ActorError, RemoteFailure};
pub use matchmaking::{GameMode, find_opponent, should_initiate};
pub use players::{
    BotDifficulty, BotPlayer, BotStrategy, FirstAvailableStrategy, GamePlayer, HardStrategy,
    HumanHandles, LocalHumanPlayer, RandomStrategy, RemotePlayer, SharedPlayer,
};
pub use receptionist::{Listing, Receptionist};
pub use registry::{ActivationState, OnDemandResolver, Registry, RemoteResolver};
pub use rpc::{InboundHandler, PeerLink, route};
pub use session::{GameEvent, GameOutcome, GameSession};
pub use system::ActorSystem;
pub use transport::{FRAME_HEADER_LEN, FrameError, FrameReader, FrameWriter, dial, encode_frame, spawn_connection};

pub use tictacfish_game::{
    ActorIdentity, CharacterTeam, GameMove, GameResult, GameState, IdentityKind, IllegalMove, PeerId,
};
