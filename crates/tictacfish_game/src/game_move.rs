//! Moves as first-class, immutable values.

use crate::{ActorIdentity, CharacterTeam};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A player placing one of their team's characters on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameMove {
    player: ActorIdentity,
    position: usize,
    team: CharacterTeam,
    team_character_id: usize,
}

impl GameMove {
    /// Creates a move. Range checks happen when the move is marked.
    #[instrument]
    pub fn new(
        player: ActorIdentity,
        position: usize,
        team: CharacterTeam,
        team_character_id: usize,
    ) -> Self {
        Self {
            player,
            position,
            team,
            team_character_id,
        }
    }

    /// Identity of the mover.
    pub fn player(&self) -> ActorIdentity {
        self.player
    }

    /// Board index (0-8, row-major).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Team of the mover.
    pub fn team(&self) -> CharacterTeam {
        self.team
    }

    /// Which of the team's characters was placed.
    pub fn team_character_id(&self) -> usize {
        self.team_character_id
    }

    /// Display character for this move.
    pub fn character(&self) -> &'static str {
        self.team.select(self.team_character_id)
    }
}

impl std::fmt::Display for GameMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.player.short(),
            self.character(),
            self.position
        )
    }
}
