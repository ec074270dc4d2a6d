//! Participant abstraction and its three variants.

mod bot;
mod human;
mod remote;
mod strategy;

pub use bot::BotPlayer;
pub use human::{HumanHandles, LocalHumanPlayer};
pub use remote::RemotePlayer;
pub use strategy::{BotDifficulty, BotStrategy, FirstAvailableStrategy, HardStrategy, RandomStrategy};

use crate::error::ActorError;
use std::sync::Arc;
use tictacfish_game::{ActorIdentity, GameMove};

/// Capability set shared by every game participant.
///
/// Implementations own their own board replica and guard it internally, so a
/// participant can be shared between the registry, a session and inbound
/// remote calls.
#[async_trait::async_trait]
pub trait GamePlayer: Send + Sync {
    /// Identity of this participant.
    fn id(&self) -> ActorIdentity;

    /// Asks this participant for its next move.
    async fn make_move(&self) -> Result<GameMove, ActorError>;

    /// Informs this participant that its opponent made `mv`.
    ///
    /// Returns [`ActorError::IllegalMove`] if the participant's board rejects
    /// the move; callers treat that as a recoverable, logged condition.
    async fn opponent_moved(&self, mv: GameMove) -> Result<(), ActorError>;
}

/// Reference-counted participant handle as stored in the registry.
pub type SharedPlayer = Arc<dyn GamePlayer>;

impl std::fmt::Debug for dyn GamePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamePlayer").field("id", &self.id()).finish()
    }
}
