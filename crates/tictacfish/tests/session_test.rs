//! Complete games between in-process participants.

use std::sync::Arc;
use tictacfish::{
    ActorError, ActorIdentity, ActorSystem, BotDifficulty, BotPlayer, CharacterTeam,
    FirstAvailableStrategy, GameEvent, GameMove, GamePlayer, GameResult, GameSession, IllegalMove,
    LocalHumanPlayer, SharedPlayer, SystemConfig,
};
use tokio::sync::mpsc;

fn bot(team: CharacterTeam, difficulty: BotDifficulty) -> SharedPlayer {
    Arc::new(BotPlayer::with_difficulty(ActorIdentity::random(), team, difficulty))
}

#[tokio::test]
async fn test_two_bots_always_finish_within_nine_moves() {
    for round in 0..50 {
        let (fish, rodents) = (
            bot(CharacterTeam::Fish, BotDifficulty::Easy),
            bot(CharacterTeam::Rodents, BotDifficulty::Hard),
        );
        let outcome = GameSession::new(fish, rodents)
            .run_driven(round % 2 == 0)
            .await
            .unwrap();
        assert!(outcome.moves <= 9);
        assert_eq!(outcome.rejected_updates, 0);
        if outcome.result == GameResult::Draw {
            assert_eq!(outcome.moves, 9);
        }
    }
}

#[tokio::test]
async fn test_events_report_every_move_and_the_result() {
    let fish: SharedPlayer = Arc::new(BotPlayer::new(
        ActorIdentity::random(),
        CharacterTeam::Fish,
        Box::new(FirstAvailableStrategy),
    ));
    let rodents: SharedPlayer = Arc::new(BotPlayer::new(
        ActorIdentity::random(),
        CharacterTeam::Rodents,
        Box::new(FirstAvailableStrategy),
    ));
    let fish_id = fish.id();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Fish takes 0, 2, 4, 6; rodents take 1, 3, 5. 2-4-6 completes the diagonal.
    let outcome = GameSession::new(fish, rodents)
        .with_events(tx)
        .run_driven(true)
        .await
        .unwrap();
    assert_eq!(outcome.moves, 7);
    assert_eq!(
        outcome.result,
        GameResult::Win {
            line: [2, 4, 6],
            winner: fish_id
        }
    );

    let mut moves = Vec::new();
    let mut result = None;
    while let Some(event) = rx.recv().await {
        match event {
            GameEvent::MoveMade { mv, .. } => moves.push(mv.position()),
            GameEvent::GameOver(r) => result = Some(r),
            GameEvent::UpdateRejected { .. } => panic!("no update should be rejected"),
        }
    }
    assert_eq!(moves, vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(result, Some(outcome.result));
}

#[tokio::test]
async fn test_rejected_update_is_reported_and_play_continues() {
    let fish: SharedPlayer = Arc::new(BotPlayer::new(
        ActorIdentity::random(),
        CharacterTeam::Fish,
        Box::new(FirstAvailableStrategy),
    ));
    let rodents: SharedPlayer = Arc::new(BotPlayer::new(
        ActorIdentity::random(),
        CharacterTeam::Rodents,
        Box::new(FirstAvailableStrategy),
    ));
    let fish_id = fish.id();

    // Rodents already hold a mark on 0, so fish's opening on 0 bounces.
    rodents
        .opponent_moved(GameMove::new(ActorIdentity::random(), 0, CharacterTeam::Fish, 0))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = GameSession::new(fish, rodents)
        .with_events(tx)
        .run_driven(true)
        .await
        .unwrap();
    assert_eq!(outcome.rejected_updates, 1);
    assert_eq!(outcome.moves, 7);
    assert_eq!(
        outcome.result,
        GameResult::Win {
            line: [2, 4, 6],
            winner: fish_id
        }
    );

    let mut rejected = Vec::new();
    let mut result = None;
    while let Some(event) = rx.recv().await {
        match event {
            GameEvent::UpdateRejected { mv, reason } => rejected.push((mv.position(), reason)),
            GameEvent::GameOver(r) => result = Some(r),
            GameEvent::MoveMade { .. } => {}
        }
    }
    assert_eq!(
        rejected,
        vec![(0, ActorError::IllegalMove(IllegalMove::Occupied(0)))]
    );
    assert_eq!(result, Some(outcome.result));
}

#[tokio::test]
async fn test_offline_human_against_local_bot() {
    let system = ActorSystem::new(SystemConfig::default());
    let (human, handles) = LocalHumanPlayer::new(CharacterTeam::Fish);
    let myself = system.spawn_player(Arc::new(human)).unwrap();
    let opponent = system
        .spawn_player(Arc::new(BotPlayer::new(
            ActorIdentity::bot_for(&myself),
            CharacterTeam::Rodents,
            Box::new(FirstAvailableStrategy),
        )))
        .unwrap();

    // The bot answers 0 with 1 and 4 with 2; 8 then completes 0-4-8.
    for position in [0, 4, 8] {
        handles.selections.send(position).unwrap();
    }

    let outcome = GameSession::new(
        system.resolve(&myself).await.unwrap(),
        system.resolve(&opponent).await.unwrap(),
    )
    .releasing(system.registry().clone())
    .run_driven(true)
    .await
    .unwrap();

    assert_eq!(outcome.moves, 5);
    assert!(matches!(outcome.result, GameResult::Win { winner, .. } if winner == myself));
    assert!(system.registry().lookup_local(&myself).is_none());
    assert!(system.registry().lookup_local(&opponent).is_none());
}

#[tokio::test]
async fn test_peer_session_takes_opponent_moves_from_stream() {
    let (human, handles) = LocalHumanPlayer::new(CharacterTeam::Fish);
    let human: SharedPlayer = Arc::new(human);
    let (opponent, _opponent_handles) = LocalHumanPlayer::new(CharacterTeam::Rodents);
    let opponent: SharedPlayer = Arc::new(opponent);
    let opponent_id = opponent.id();

    let (remote_tx, mut remote_rx) = mpsc::unbounded_channel();
    for position in [0, 1, 2] {
        handles.selections.send(position).unwrap();
    }
    for position in [3, 4] {
        remote_tx
            .send(tictacfish::GameMove::new(opponent_id, position, CharacterTeam::Rodents, 0))
            .unwrap();
    }

    let outcome = GameSession::new(human.clone(), opponent)
        .run_peer(&mut remote_rx, true)
        .await
        .unwrap();
    assert_eq!(outcome.moves, 5);
    assert!(matches!(outcome.result, GameResult::Win { line: [0, 1, 2], .. }));
}
