//! Drives one game between two participants.

use crate::error::ActorError;
use crate::players::SharedPlayer;
use crate::registry::Registry;
use derive_new::new;
use std::time::Duration;
use tictacfish_game::{GameMove, GameResult, GameState};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Progress reported to a rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A move was accepted by the session board.
    MoveMade {
        /// The move.
        mv: GameMove,
        /// Board after the move.
        board: String,
    },
    /// A participant rejected an `opponent_moved` update.
    UpdateRejected {
        /// The rejected move.
        mv: GameMove,
        /// Why it was rejected.
        reason: ActorError,
    },
    /// The game reached a terminal result.
    GameOver(GameResult),
}

/// Summary of a finished game.
#[derive(Debug, Clone, PartialEq, new)]
pub struct GameOutcome {
    /// Terminal result.
    pub result: GameResult,
    /// Moves accepted by the session board.
    pub moves: usize,
    /// `opponent_moved` updates that a participant rejected.
    pub rejected_updates: usize,
}

/// One game between "myself" and an opponent, with its own board replica.
pub struct GameSession {
    myself: SharedPlayer,
    opponent: SharedPlayer,
    state: GameState,
    events: Option<mpsc::UnboundedSender<GameEvent>>,
    registry: Option<Registry>,
    turn_timeout: Option<Duration>,
    rejected_updates: usize,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("myself", &self.myself.id())
            .field("opponent", &self.opponent.id())
            .field("moves", &self.state.move_count())
            .finish()
    }
}

impl GameSession {
    /// Creates a session on an empty board.
    #[instrument(skip_all, fields(myself = %myself.id().short(), opponent = %opponent.id().short()))]
    pub fn new(myself: SharedPlayer, opponent: SharedPlayer) -> Self {
        info!("Creating game session");
        Self {
            myself,
            opponent,
            state: GameState::new(),
            events: None,
            registry: None,
            turn_timeout: None,
            rejected_updates: 0,
        }
    }

    /// Reports progress on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<GameEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Releases both participants' local bindings when the session ends.
    pub fn releasing(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bounds how long a peer-mode session waits for the opponent's move.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// The session's board.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn emit(&self, event: GameEvent) {
        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            debug!("Event receiver dropped");
        }
    }

    /// Marks `mv` on the session board after checking who made it.
    fn accept(&mut self, mv: GameMove, mover: &SharedPlayer) -> Result<(), ActorError> {
        if mv.player() != mover.id() {
            return Err(ActorError::protocol(format!(
                "move by {} during the turn of {}",
                mv.player(),
                mover.id()
            )));
        }
        self.state.mark(mv)?;
        self.emit(GameEvent::MoveMade {
            mv,
            board: self.state.display(),
        });
        Ok(())
    }

    /// Tells `receiver` about `mv`; a rejection is logged and counted.
    async fn relay(&mut self, receiver: &SharedPlayer, mv: GameMove) -> Result<(), ActorError> {
        match receiver.opponent_moved(mv).await {
            Ok(()) => Ok(()),
            Err(reason) if reason.is_illegal_move() => {
                warn!(receiver = %receiver.id().short(), position = mv.position(), %reason, "Update rejected");
                self.rejected_updates += 1;
                self.emit(GameEvent::UpdateRejected { mv, reason });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn finish(&mut self) -> Option<GameOutcome> {
        let result = self.state.check_win()?;
        info!(?result, moves = self.state.move_count(), "Game over");
        self.emit(GameEvent::GameOver(result));
        Some(GameOutcome::new(
            result,
            self.state.move_count(),
            self.rejected_updates,
        ))
    }

    fn release(&self) {
        if let Some(registry) = &self.registry {
            registry.release(&self.myself.id());
            registry.release(&self.opponent.id());
        }
    }

    /// Asks each participant for moves in turn and relays them to the other.
    ///
    /// Used when the opponent can be driven directly: a local bot or a bot
    /// hosted by the server.
    #[instrument(skip(self), fields(myself = %self.myself.id().short()))]
    pub async fn run_driven(mut self, myself_first: bool) -> Result<GameOutcome, ActorError> {
        let outcome = self.drive(myself_first).await;
        self.release();
        outcome
    }

    async fn drive(&mut self, myself_first: bool) -> Result<GameOutcome, ActorError> {
        let (mut mover, mut waiting) = if myself_first {
            (self.myself.clone(), self.opponent.clone())
        } else {
            (self.opponent.clone(), self.myself.clone())
        };
        loop {
            if let Some(outcome) = self.finish() {
                return Ok(outcome);
            }
            debug!(mover = %mover.id().short(), "Waiting for move");
            let mv = mover.make_move().await?;
            self.accept(mv, &mover)?;
            self.relay(&waiting, mv).await?;
            std::mem::swap(&mut mover, &mut waiting);
        }
    }

    /// Plays against a peer that drives its own side.
    ///
    /// Only "myself" is asked for moves; they are pushed to the opponent with
    /// `opponent_moved`. The opponent's moves arrive through `opponent_moves`,
    /// the observed-move stream of the local participant.
    #[instrument(skip(self, opponent_moves), fields(myself = %self.myself.id().short()))]
    pub async fn run_peer(
        mut self,
        opponent_moves: &mut mpsc::UnboundedReceiver<GameMove>,
        move_first: bool,
    ) -> Result<GameOutcome, ActorError> {
        let outcome = self.exchange(opponent_moves, move_first).await;
        self.release();
        outcome
    }

    async fn exchange(
        &mut self,
        opponent_moves: &mut mpsc::UnboundedReceiver<GameMove>,
        move_first: bool,
    ) -> Result<GameOutcome, ActorError> {
        let mut my_turn = move_first;
        loop {
            if let Some(outcome) = self.finish() {
                return Ok(outcome);
            }
            if my_turn {
                let myself = self.myself.clone();
                let opponent = self.opponent.clone();
                let mv = myself.make_move().await?;
                self.accept(mv, &myself)?;
                self.relay(&opponent, mv).await?;
            } else {
                let mv = self.next_opponent_move(opponent_moves).await?;
                let opponent = self.opponent.clone();
                self.accept(mv, &opponent)?;
            }
            my_turn = !my_turn;
        }
    }

    async fn next_opponent_move(
        &self,
        opponent_moves: &mut mpsc::UnboundedReceiver<GameMove>,
    ) -> Result<GameMove, ActorError> {
        let received = match self.turn_timeout {
            Some(after) => tokio::time::timeout(after, opponent_moves.recv())
                .await
                .map_err(|_| ActorError::Timeout {
                    method: "opponent_moved".to_string(),
                    after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => opponent_moves.recv().await,
        };
        received.ok_or(ActorError::InputClosed)
    }
}
