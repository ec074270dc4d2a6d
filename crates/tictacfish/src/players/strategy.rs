//! Pluggable bot move selection.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tictacfish_game::{CharacterTeam, GameState, WINNING_LINES};
use tracing::instrument;

/// Chooses a bot's next position.
pub trait BotStrategy: Send {
    /// Picks an open position for `team`, or `None` if there is none.
    fn decide(&mut self, state: &GameState, team: CharacterTeam) -> Option<usize>;
}

/// Uniformly random open position.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomStrategy;

impl BotStrategy for RandomStrategy {
    fn decide(&mut self, state: &GameState, _team: CharacterTeam) -> Option<usize> {
        let mut positions = state.available_positions();
        positions.shuffle(&mut rand::thread_rng());
        positions.first().copied()
    }
}

/// Lowest open position; deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailableStrategy;

impl BotStrategy for FirstAvailableStrategy {
    fn decide(&mut self, state: &GameState, _team: CharacterTeam) -> Option<usize> {
        state.available_positions().first().copied()
    }
}

/// Wins if it can, blocks if it must, otherwise plays randomly.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardStrategy;

impl HardStrategy {
    fn completes_line(state: &GameState, position: usize, team: CharacterTeam) -> bool {
        WINNING_LINES
            .iter()
            .filter(|line| line.contains(&position))
            .any(|line| {
                line.iter()
                    .filter(|&&cell| cell != position)
                    .all(|&cell| state.at(cell).is_some_and(|mv| mv.team() == team))
            })
    }
}

impl BotStrategy for HardStrategy {
    #[instrument(skip(self, state))]
    fn decide(&mut self, state: &GameState, team: CharacterTeam) -> Option<usize> {
        let open = state.available_positions();
        open.iter()
            .copied()
            .find(|&pos| Self::completes_line(state, pos, team))
            .or_else(|| {
                open.iter()
                    .copied()
                    .find(|&pos| Self::completes_line(state, pos, team.opponent()))
            })
            .or_else(|| RandomStrategy.decide(state, team))
    }
}

/// How strong a bot plays.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BotDifficulty {
    /// Random moves.
    #[default]
    Easy,
    /// Takes wins and blocks losses.
    Hard,
}

impl BotDifficulty {
    /// Strategy implementing this difficulty.
    pub fn strategy(self) -> Box<dyn BotStrategy> {
        match self {
            BotDifficulty::Easy => Box::new(RandomStrategy),
            BotDifficulty::Hard => Box::new(HardStrategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictacfish_game::{ActorIdentity, GameMove};

    fn board(fish: &[usize], rodents: &[usize]) -> GameState {
        let f = ActorIdentity::random();
        let r = ActorIdentity::random();
        let mut state = GameState::new();
        for &p in fish {
            state.mark(GameMove::new(f, p, CharacterTeam::Fish, 0)).unwrap();
        }
        for &p in rodents {
            state.mark(GameMove::new(r, p, CharacterTeam::Rodents, 0)).unwrap();
        }
        state
    }

    #[test]
    fn test_random_picks_an_open_position() {
        let state = board(&[0, 1], &[4]);
        for _ in 0..20 {
            let pos = RandomStrategy.decide(&state, CharacterTeam::Fish).unwrap();
            assert!(state.at(pos).is_none());
        }
    }

    #[test]
    fn test_first_available_is_lowest() {
        let state = board(&[0], &[1]);
        assert_eq!(FirstAvailableStrategy.decide(&state, CharacterTeam::Fish), Some(2));
    }

    #[test]
    fn test_hard_takes_the_win_before_blocking() {
        let state = board(&[0, 1], &[3, 4]);
        assert_eq!(HardStrategy.decide(&state, CharacterTeam::Rodents), Some(5));
        assert_eq!(HardStrategy.decide(&state, CharacterTeam::Fish), Some(2));
    }

    #[test]
    fn test_hard_blocks() {
        let state = board(&[0, 1], &[4]);
        assert_eq!(HardStrategy.decide(&state, CharacterTeam::Rodents), Some(2));
    }

    #[test]
    fn test_full_board_has_no_decision() {
        let state = board(&[0, 2, 3, 7, 8], &[1, 4, 5, 6]);
        assert_eq!(RandomStrategy.decide(&state, CharacterTeam::Fish), None);
        assert_eq!(HardStrategy.decide(&state, CharacterTeam::Fish), None);
    }
}
