//! Automated participant.

use super::strategy::{BotDifficulty, BotStrategy, RandomStrategy};
use super::GamePlayer;
use crate::error::ActorError;
use tictacfish_game::{ActorIdentity, CharacterTeam, GameMove, GameState};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

struct BotState {
    game: GameState,
    strategy: Box<dyn BotStrategy>,
    moves_made: usize,
}

/// Bot that keeps its own board replica and asks a strategy for positions.
pub struct BotPlayer {
    id: ActorIdentity,
    team: CharacterTeam,
    state: Mutex<BotState>,
}

impl std::fmt::Debug for BotPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotPlayer")
            .field("id", &self.id)
            .field("team", &self.team)
            .finish()
    }
}

impl BotPlayer {
    /// Creates a bot with an explicit strategy.
    #[instrument(skip(strategy), fields(id = %id.short()))]
    pub fn new(id: ActorIdentity, team: CharacterTeam, strategy: Box<dyn BotStrategy>) -> Self {
        info!(%team, "Creating bot");
        Self {
            id,
            team,
            state: Mutex::new(BotState {
                game: GameState::new(),
                strategy,
                moves_made: 0,
            }),
        }
    }

    /// Random bot with a fresh identity.
    pub fn random(team: CharacterTeam) -> Self {
        Self::new(ActorIdentity::random(), team, Box::new(RandomStrategy))
    }

    /// Bot playing at the given difficulty.
    pub fn with_difficulty(id: ActorIdentity, team: CharacterTeam, difficulty: BotDifficulty) -> Self {
        Self::new(id, team, difficulty.strategy())
    }

    /// The bot's team.
    pub fn team(&self) -> CharacterTeam {
        self.team
    }

    /// Snapshot of the bot's board replica.
    pub async fn state(&self) -> GameState {
        self.state.lock().await.game.clone()
    }
}

#[async_trait::async_trait]
impl GamePlayer for BotPlayer {
    fn id(&self) -> ActorIdentity {
        self.id
    }

    #[instrument(skip(self), fields(id = %self.id.short()))]
    async fn make_move(&self) -> Result<GameMove, ActorError> {
        let mut state = self.state.lock().await;
        if state.game.is_over() {
            debug!("Game already over");
            return Err(ActorError::NoMoveAvailable);
        }

        let BotState {
            game, strategy, ..
        } = &mut *state;
        let position = strategy
            .decide(game, self.team)
            .ok_or(ActorError::NoMoveAvailable)?;

        let mv = GameMove::new(
            self.id,
            position,
            self.team,
            CharacterTeam::character_id(state.moves_made),
        );
        state.game.mark(mv)?;
        state.moves_made += 1;
        debug!(position, "Bot moved");
        Ok(mv)
    }

    #[instrument(skip(self), fields(id = %self.id.short(), position = mv.position()))]
    async fn opponent_moved(&self, mv: GameMove) -> Result<(), ActorError> {
        let mut state = self.state.lock().await;
        state.game.mark(mv).map_err(|e| {
            warn!(error = %e, "Rejected opponent move");
            ActorError::from(e)
        })
    }
}
