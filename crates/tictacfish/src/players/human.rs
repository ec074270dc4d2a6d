//! Participant driven by externally supplied positions.

use super::GamePlayer;
use crate::error::ActorError;
use tictacfish_game::{ActorIdentity, CharacterTeam, GameMove, GameState, IllegalMove};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

struct HumanState {
    game: GameState,
    moves_made: usize,
}

/// Channels connecting a [`LocalHumanPlayer`] to its user interface.
#[derive(Debug)]
pub struct HumanHandles {
    /// Send selected positions (`0..9`) here.
    pub selections: mpsc::UnboundedSender<usize>,
    /// Opponent moves, as they are accepted by the player's board.
    pub opponent_moves: mpsc::UnboundedReceiver<GameMove>,
}

/// A person at this process, choosing positions through [`HumanHandles`].
pub struct LocalHumanPlayer {
    id: ActorIdentity,
    team: CharacterTeam,
    selections: Mutex<mpsc::UnboundedReceiver<usize>>,
    state: Mutex<HumanState>,
    observed: mpsc::UnboundedSender<GameMove>,
}

impl std::fmt::Debug for LocalHumanPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHumanPlayer")
            .field("id", &self.id)
            .field("team", &self.team)
            .finish()
    }
}

impl LocalHumanPlayer {
    /// Creates a player with a fresh identity.
    pub fn new(team: CharacterTeam) -> (Self, HumanHandles) {
        Self::with_id(ActorIdentity::random(), team)
    }

    /// Creates a player with a given identity.
    #[instrument(fields(id = %id.short()))]
    pub fn with_id(id: ActorIdentity, team: CharacterTeam) -> (Self, HumanHandles) {
        let (selections_tx, selections_rx) = mpsc::unbounded_channel();
        let (observed_tx, observed_rx) = mpsc::unbounded_channel();
        info!(%team, "Creating local human player");
        let player = Self {
            id,
            team,
            selections: Mutex::new(selections_rx),
            state: Mutex::new(HumanState {
                game: GameState::new(),
                moves_made: 0,
            }),
            observed: observed_tx,
        };
        let handles = HumanHandles {
            selections: selections_tx,
            opponent_moves: observed_rx,
        };
        (player, handles)
    }

    /// The player's team.
    pub fn team(&self) -> CharacterTeam {
        self.team
    }

    /// Snapshot of the player's board replica.
    pub async fn state(&self) -> GameState {
        self.state.lock().await.game.clone()
    }
}

#[async_trait::async_trait]
impl GamePlayer for LocalHumanPlayer {
    fn id(&self) -> ActorIdentity {
        self.id
    }

    /// Waits for a legal selection, discarding illegal ones.
    #[instrument(skip(self), fields(id = %self.id.short()))]
    async fn make_move(&self) -> Result<GameMove, ActorError> {
        let mut selections = self.selections.lock().await;
        loop {
            if self.state.lock().await.game.is_over() {
                return Err(IllegalMove::GameOver.into());
            }
            let Some(position) = selections.recv().await else {
                warn!("Input closed while waiting for a move");
                return Err(ActorError::InputClosed);
            };

            let mut state = self.state.lock().await;
            let mv = GameMove::new(
                self.id,
                position,
                self.team,
                CharacterTeam::character_id(state.moves_made),
            );
            match state.game.mark(mv) {
                Ok(()) => {
                    state.moves_made += 1;
                    debug!(position, "Human moved");
                    return Ok(mv);
                }
                Err(e) => warn!(position, error = %e, "Ignoring illegal selection"),
            }
        }
    }

    #[instrument(skip(self), fields(id = %self.id.short(), position = mv.position()))]
    async fn opponent_moved(&self, mv: GameMove) -> Result<(), ActorError> {
        self.state.lock().await.game.mark(mv).map_err(|e| {
            warn!(error = %e, "Rejected opponent move");
            ActorError::from(e)
        })?;
        if self.observed.send(mv).is_err() {
            debug!("No one is watching opponent moves");
        }
        Ok(())
    }
}
