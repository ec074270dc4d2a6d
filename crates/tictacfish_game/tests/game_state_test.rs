//! Tests for the board state machine.

use tictacfish_game::{
    ActorIdentity, CharacterTeam, GameMove, GameResult, GameState, IllegalMove, WINNING_LINES,
};

fn players() -> (ActorIdentity, ActorIdentity) {
    (ActorIdentity::random(), ActorIdentity::random())
}

#[test]
fn test_every_line_wins_for_either_team() {
    for line in WINNING_LINES {
        for team in [CharacterTeam::Fish, CharacterTeam::Rodents] {
            let player = ActorIdentity::random();
            let mut state = GameState::new();
            for (i, pos) in line.iter().enumerate() {
                state.mark(GameMove::new(player, *pos, team, i)).unwrap();
            }
            assert_eq!(
                state.check_win(),
                Some(GameResult::Win { line, winner: player }),
                "line {line:?} should win"
            );
        }
    }
}

#[test]
fn test_occupied_position_rejected_regardless_of_team() {
    let (fish, rodent) = players();
    let mut state = GameState::new();
    state.mark(GameMove::new(fish, 4, CharacterTeam::Fish, 0)).unwrap();

    let same_team = state.mark(GameMove::new(fish, 4, CharacterTeam::Fish, 1));
    let other_team = state.mark(GameMove::new(rodent, 4, CharacterTeam::Rodents, 0));

    assert_eq!(same_team, Err(IllegalMove::Occupied(4)));
    assert_eq!(other_team, Err(IllegalMove::Occupied(4)));
    assert_eq!(state.move_count(), 1);
}

#[test]
fn test_out_of_range_rejected() {
    let (fish, _) = players();
    let mut state = GameState::new();
    let result = state.mark(GameMove::new(fish, 9, CharacterTeam::Fish, 0));
    assert_eq!(result, Err(IllegalMove::OutOfRange(9)));
    assert_eq!(state.at(9), None);
    assert_eq!(state.move_count(), 0);
}

#[test]
fn test_mark_after_win_rejected() {
    let (fish, rodent) = players();
    let mut state = GameState::new();
    for pos in [0, 4, 8] {
        state.mark(GameMove::new(fish, pos, CharacterTeam::Fish, 0)).unwrap();
    }
    assert!(state.is_over());

    let late = state.mark(GameMove::new(rodent, 1, CharacterTeam::Rodents, 0));
    assert_eq!(late, Err(IllegalMove::GameOver));
    assert_eq!(state.at(1), None);
}

#[test]
fn test_full_board_without_line_is_draw() {
    let (fish, rodent) = players();
    let mut state = GameState::new();
    // F R F
    // F R R
    // R F F
    let layout = [
        (0, CharacterTeam::Fish),
        (1, CharacterTeam::Rodents),
        (2, CharacterTeam::Fish),
        (4, CharacterTeam::Rodents),
        (3, CharacterTeam::Fish),
        (5, CharacterTeam::Rodents),
        (7, CharacterTeam::Fish),
        (6, CharacterTeam::Rodents),
        (8, CharacterTeam::Fish),
    ];
    for (i, (pos, team)) in layout.into_iter().enumerate() {
        let player = if team == CharacterTeam::Fish { fish } else { rodent };
        state.mark(GameMove::new(player, pos, team, i / 2)).unwrap();
    }

    assert_eq!(state.move_count(), 9);
    assert_eq!(state.check_win(), Some(GameResult::Draw));
    assert!(state.available_positions().is_empty());
    assert_eq!(
        state.mark(GameMove::new(fish, 0, CharacterTeam::Fish, 0)),
        Err(IllegalMove::GameOver)
    );
}

#[test]
fn test_move_count_increments_by_one() {
    let (fish, rodent) = players();
    let mut state = GameState::new();
    let moves = [(fish, CharacterTeam::Fish, 0), (rodent, CharacterTeam::Rodents, 5)];
    for (expected, (player, team, pos)) in moves.into_iter().enumerate() {
        state.mark(GameMove::new(player, pos, team, 0)).unwrap();
        assert_eq!(state.move_count(), expected + 1);
        assert_eq!(state.at(pos).map(GameMove::player), Some(player));
    }
    assert_eq!(state.available_positions(), vec![1, 2, 3, 4, 6, 7, 8]);
}

#[test]
fn test_moves_serialize_with_string_identity() {
    let player: ActorIdentity = "player:0000000000000000000000000000002a".parse().unwrap();
    let mv = GameMove::new(player, 3, CharacterTeam::Rodents, 1);
    let json = serde_json::to_value(mv).unwrap();
    assert_eq!(json["player"], "player:0000000000000000000000000000002a");
    assert_eq!(json["team"], "rodents");
    let back: GameMove = serde_json::from_value(json).unwrap();
    assert_eq!(back, mv);
}
