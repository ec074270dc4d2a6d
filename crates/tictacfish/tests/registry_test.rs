//! Registry binding, on-demand activation and release.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tictacfish::{
    ActivationState, ActorError, ActorIdentity, BotPlayer, CharacterTeam, GamePlayer,
    OnDemandResolver, Registry, SharedPlayer,
};

/// Creates bots slowly and counts how often it was asked.
struct SlowBotResolver {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl OnDemandResolver for SlowBotResolver {
    async fn resolve(&self, identity: &ActorIdentity) -> Option<SharedPlayer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if !identity.is_bot() {
            return None;
        }
        let bot: SharedPlayer = Arc::new(BotPlayer::random(CharacterTeam::Rodents));
        Some(bot)
    }
}

#[test]
fn test_register_rejects_duplicate_identity() {
    let registry = Registry::new();
    let bot = Arc::new(BotPlayer::random(CharacterTeam::Fish));
    let id = bot.id();

    registry.register(id, bot.clone()).unwrap();
    assert_eq!(
        registry.register(id, bot).unwrap_err(),
        ActorError::DuplicateIdentity(id)
    );
    assert_eq!(registry.active_count(), 1);
}

#[tokio::test]
async fn test_resolve_prefers_local_binding() {
    let registry = Registry::new();
    let resolver = Arc::new(SlowBotResolver {
        calls: AtomicUsize::new(0),
    });
    registry.set_on_demand(resolver.clone());

    let bot: SharedPlayer = Arc::new(BotPlayer::random(CharacterTeam::Fish));
    registry.register(bot.id(), bot.clone()).unwrap();

    let resolved = registry.resolve(&bot.id()).await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &bot));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_resolves_activate_once() {
    let registry = Registry::new();
    let resolver = Arc::new(SlowBotResolver {
        calls: AtomicUsize::new(0),
    });
    registry.set_on_demand(resolver.clone());
    let target = ActorIdentity::bot_for(&ActorIdentity::random());

    let first = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.resolve(&target).await })
    };
    let second = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.resolve(&target).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.activation_state(&target), Some(ActivationState::Active));
}

#[tokio::test]
async fn test_unresolvable_identity_is_unknown() {
    let registry = Registry::new();
    registry.set_on_demand(Arc::new(SlowBotResolver {
        calls: AtomicUsize::new(0),
    }));
    let player = ActorIdentity::random();

    let err = registry.resolve(&player).await.unwrap_err();
    assert_eq!(err, ActorError::UnknownIdentity(player));
    assert_eq!(registry.activation_state(&player), None);
}

#[tokio::test]
async fn test_resolve_without_handler_is_unknown() {
    let registry = Registry::new();
    let id = ActorIdentity::random();
    assert!(matches!(
        registry.resolve(&id).await,
        Err(ActorError::UnknownIdentity(_))
    ));
}

#[tokio::test]
async fn test_release_then_resolve_reactivates() {
    let registry = Registry::new();
    let resolver = Arc::new(SlowBotResolver {
        calls: AtomicUsize::new(0),
    });
    registry.set_on_demand(resolver.clone());
    let target = ActorIdentity::bot_for(&ActorIdentity::random());

    let first = registry.resolve(&target).await.unwrap();
    assert!(registry.release(&target));
    assert_eq!(registry.activation_state(&target), Some(ActivationState::Released));
    assert!(registry.lookup_local(&target).is_none());
    assert!(!registry.release(&target));

    let second = registry.resolve(&target).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_closure_resolver() {
    let registry = Registry::new();
    registry.set_on_demand(Arc::new(|identity: &ActorIdentity| -> Option<SharedPlayer> {
        let bot: SharedPlayer = Arc::new(BotPlayer::with_difficulty(
            *identity,
            CharacterTeam::Fish,
            tictacfish::BotDifficulty::Hard,
        ));
        Some(bot)
    }));

    let id = ActorIdentity::random();
    let resolved = registry.resolve(&id).await.unwrap();
    assert_eq!(resolved.id(), id);
    assert!(registry.lookup_local(&id).is_some());
}

#[tokio::test]
async fn test_release_without_handler_drops_the_entry() {
    let registry = Registry::new();
    let bots: Vec<SharedPlayer> = (0..10)
        .map(|_| -> SharedPlayer { Arc::new(BotPlayer::random(CharacterTeam::Fish)) })
        .collect();
    for bot in &bots {
        registry.register(bot.id(), bot.clone()).unwrap();
    }
    for bot in &bots {
        assert!(registry.release(&bot.id()));
    }

    assert_eq!(registry.active_count(), 0);
    assert_eq!(format!("{registry:?}"), "Registry { entries: 0 }");
    let id = bots[0].id();
    assert_eq!(registry.activation_state(&id), None);
    assert_eq!(
        registry.resolve(&id).await.unwrap_err(),
        ActorError::UnknownIdentity(id)
    );
    registry.register(id, bots[0].clone()).unwrap();
}
