//! Board state machine.
//!
//! The terminal result is never cached: [`GameState::check_win`] evaluates the
//! eight lines on every call, so a late mark can never leave a stale result.

use crate::{ActorIdentity, GameMove, IllegalMove};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Number of cells on the board.
pub const BOARD_SIZE: usize = 9;

/// Every winning line: 3 rows, 3 columns, 2 diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    /// One team completed a line.
    Win {
        /// The completed line, as board indices.
        line: [usize; 3],
        /// The player whose move occupies the first cell of the line.
        winner: ActorIdentity,
    },
    /// The board is full and no line is complete.
    Draw,
}

/// A 3x3 board plus the number of accepted moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: [Option<GameMove>; BOARD_SIZE],
    move_count: usize,
}

impl GameState {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move at `position`, if any. Out-of-range positions read as empty.
    pub fn at(&self, position: usize) -> Option<&GameMove> {
        self.board.get(position).and_then(Option::as_ref)
    }

    /// Number of accepted moves.
    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Marks a move on the board.
    ///
    /// # Errors
    ///
    /// Rejects moves after a terminal result, outside `0..9`, or onto an
    /// occupied cell.
    #[instrument(skip(self), fields(move_count = self.move_count))]
    pub fn mark(&mut self, mv: GameMove) -> Result<(), IllegalMove> {
        if self.check_win().is_some() {
            return Err(IllegalMove::GameOver);
        }
        let position = mv.position();
        let cell = self
            .board
            .get_mut(position)
            .ok_or(IllegalMove::OutOfRange(position))?;
        if cell.is_some() {
            return Err(IllegalMove::Occupied(position));
        }
        *cell = Some(mv);
        self.move_count += 1;
        debug!(position, move_count = self.move_count, "Marked move");
        Ok(())
    }

    /// Evaluates the board for a win or a draw.
    pub fn check_win(&self) -> Option<GameResult> {
        for line in WINNING_LINES {
            let [a, b, c] = line.map(|i| self.board[i]);
            if let (Some(a), Some(b), Some(c)) = (a, b, c)
                && a.team() == b.team()
                && b.team() == c.team()
            {
                return Some(GameResult::Win {
                    line,
                    winner: a.player(),
                });
            }
        }

        if self.is_full() {
            return Some(GameResult::Draw);
        }

        None
    }

    /// Whether a win or draw has been reached.
    pub fn is_over(&self) -> bool {
        self.check_win().is_some()
    }

    /// Whether every cell holds a move.
    pub fn is_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }

    /// Unfilled positions in ascending order.
    pub fn available_positions(&self) -> Vec<usize> {
        (0..BOARD_SIZE).filter(|&i| self.board[i].is_none()).collect()
    }

    /// Formats the board as text, numbering empty cells 1-9.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                match &self.board[pos] {
                    Some(mv) => result.push_str(mv.character()),
                    None => result.push_str(&format!(" {}", pos + 1)),
                }
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n--+--+--\n");
            }
        }
        result
    }
}
