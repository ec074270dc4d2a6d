//! Pure game logic for tic-tac-fish.
//!
//! - **Identity**: [`ActorIdentity`], the opaque, ordered participant handle
//! - **Teams**: [`CharacterTeam`] and its display characters
//! - **Moves**: [`GameMove`]
//! - **State machine**: [`GameState`] with move legality and win/draw detection
//!
//! Nothing here performs I/O or awaits; the actor substrate in `tictacfish`
//! builds on these types.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod game_move;
mod identity;
mod state;
mod team;

pub use error::IllegalMove;
pub use game_move::GameMove;
pub use identity::{ActorIdentity, IdentityKind, IdentityParseError, PeerId};
pub use state::{BOARD_SIZE, GameResult, GameState, WINNING_LINES};
pub use team::CharacterTeam;
