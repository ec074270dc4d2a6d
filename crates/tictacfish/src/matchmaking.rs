//! Finding an opponent and deciding who opens.

use crate::error::ActorError;
use crate::system::ActorSystem;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tictacfish_game::{ActorIdentity, CharacterTeam, IdentityKind};
use tracing::{debug, info, instrument};

/// Where the opponent comes from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameMode {
    /// A bot in this process.
    Offline,
    /// A bot activated on demand by a server.
    Internet,
    /// Another player found through the receptionist.
    LocalNetwork,
}

/// Subscribes to `opponent_team`'s tag and returns the first other player listed.
///
/// # Errors
///
/// [`ActorError::ListingClosed`] if the listing ends first.
#[instrument(skip(system), fields(myself = %myself.short()))]
pub async fn find_opponent(
    system: &ActorSystem,
    myself: ActorIdentity,
    opponent_team: CharacterTeam,
) -> Result<ActorIdentity, ActorError> {
    let tag = opponent_team.tag();
    let mut listing = system.listing(IdentityKind::Player, tag);
    while let Some(candidate) = listing.next().await {
        if candidate == myself {
            debug!("Skipping own listing");
            continue;
        }
        info!(opponent = %candidate.short(), "Opponent found");
        return Ok(candidate);
    }
    Err(ActorError::ListingClosed {
        tag: tag.to_string(),
    })
}

/// Whether `myself` opens contact with `opponent` after mutual discovery.
///
/// The lower identity initiates; the other side waits.
pub fn should_initiate(myself: &ActorIdentity, opponent: &ActorIdentity) -> bool {
    myself < opponent
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictacfish_game::PeerId;

    #[test]
    fn test_exactly_one_side_initiates() {
        for _ in 0..100 {
            let a = ActorIdentity::random();
            let b = ActorIdentity::random();
            assert_ne!(should_initiate(&a, &b), should_initiate(&b, &a));
        }
    }

    #[test]
    fn test_lower_identity_initiates() {
        for _ in 0..100 {
            let mut pair = [ActorIdentity::random(), ActorIdentity::random()];
            pair.sort();
            let [lower, higher] = pair;
            if lower == higher {
                continue;
            }
            assert!(should_initiate(&lower, &higher));
            assert!(!should_initiate(&higher, &lower));
        }
    }

    #[test]
    fn test_origin_does_not_change_initiator() {
        let a = ActorIdentity::random();
        let b = ActorIdentity::random();
        assert_eq!(
            should_initiate(&a, &b),
            should_initiate(&a, &b.with_origin(PeerId(9)))
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(GameMode::LocalNetwork.to_string(), "local-network");
        assert_eq!("internet".parse::<GameMode>().unwrap(), GameMode::Internet);
    }
}
