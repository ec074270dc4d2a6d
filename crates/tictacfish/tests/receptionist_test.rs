//! Listing snapshots, live updates and check-in idempotency.

use futures::StreamExt;
use std::time::Duration;
use tictacfish::{ActorIdentity, IdentityKind, Listing, Receptionist};

const TAG: &str = "team:fish";

async fn next(listing: &mut Listing) -> Option<ActorIdentity> {
    tokio::time::timeout(Duration::from_millis(100), listing.next())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_empty_snapshot_then_updates_in_order() {
    let receptionist = Receptionist::new();
    let mut listing = receptionist.listing(IdentityKind::Player, TAG);
    assert_eq!(next(&mut listing).await, None);

    let ids: Vec<_> = (0..3).map(|_| ActorIdentity::random()).collect();
    for id in &ids {
        receptionist.check_in(*id, TAG);
    }
    for id in &ids {
        assert_eq!(next(&mut listing).await, Some(*id));
    }
}

#[tokio::test]
async fn test_late_subscriber_sees_all_prior_check_ins() {
    let receptionist = Receptionist::new();
    let ids: Vec<_> = (0..5).map(|_| ActorIdentity::random()).collect();
    for id in &ids {
        receptionist.check_in(*id, TAG);
    }

    let listing = receptionist.listing(IdentityKind::Player, TAG);
    let seen: Vec<_> = listing.take(5).collect().await;
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_check_in_is_idempotent() {
    let receptionist = Receptionist::new();
    let mut listing = receptionist.listing(IdentityKind::Player, TAG);
    let id = ActorIdentity::random();

    receptionist.check_in(id, TAG);
    receptionist.check_in(id, TAG);

    assert_eq!(next(&mut listing).await, Some(id));
    assert_eq!(next(&mut listing).await, None);
    assert_eq!(receptionist.entries(TAG), vec![id]);
}

#[tokio::test]
async fn test_tags_are_independent() {
    let receptionist = Receptionist::new();
    let mut rodents = receptionist.listing(IdentityKind::Player, "team:rodents");
    receptionist.check_in(ActorIdentity::random(), TAG);
    assert_eq!(next(&mut rodents).await, None);
}

#[tokio::test]
async fn test_listing_is_restartable() {
    let receptionist = Receptionist::new();
    let id = ActorIdentity::random();
    receptionist.check_in(id, TAG);

    let first = receptionist.listing(IdentityKind::Player, TAG);
    drop(first);
    let mut second = receptionist.listing(IdentityKind::Player, TAG);
    assert_eq!(second.tag(), TAG);
    assert_eq!(next(&mut second).await, Some(id));

    let newcomer = ActorIdentity::random();
    receptionist.check_in(newcomer, TAG);
    assert_eq!(next(&mut second).await, Some(newcomer));
}

#[tokio::test]
async fn test_check_out_removes_entry() {
    let receptionist = Receptionist::new();
    let id = ActorIdentity::random();
    receptionist.check_in(id, TAG);
    assert!(receptionist.check_out(&id, TAG));
    assert!(!receptionist.check_out(&id, TAG));
    assert!(receptionist.entries(TAG).is_empty());
}
