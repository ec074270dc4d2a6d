//! Game rule violations.

use serde::{Deserialize, Serialize};

/// A move the board state machine refuses to mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum IllegalMove {
    /// The position is not on the 3x3 board.
    #[display("Position {} is outside the board (0-8)", _0)]
    OutOfRange(usize),

    /// The position already holds a move.
    #[display("Position {} is already occupied", _0)]
    Occupied(usize),

    /// The game already has a winner or a full board.
    #[display("Game is already over")]
    GameOver,
}

impl std::error::Error for IllegalMove {}
