//! Location-independent participant identities.
//!
//! An [`ActorIdentity`] names a participant no matter which process hosts it.
//! The random token is what makes two identities equal; the optional
//! [`PeerId`] origin only records which connection an identity was learned
//! from, so a locally created identity and the same identity seen from a
//! remote peer compare equal.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use tracing::instrument;

/// Connection-scoped tag naming the peer an identity was learned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// What kind of participant an identity addresses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum IdentityKind {
    /// A player driven by a person or a local participant.
    Player,
    /// A bot created on demand for a specific player.
    Bot,
    /// A built-in service of the actor system (e.g. the receptionist).
    System,
}

/// Opaque, globally unique, totally ordered participant handle.
///
/// The wire form is `<kind>:<32 hex digits>`, e.g.
/// `player:000000000000000000000000deadbeef`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorIdentity {
    kind: IdentityKind,
    token: u128,
    origin: Option<PeerId>,
}

impl ActorIdentity {
    /// Generates a fresh, locally created player identity.
    #[instrument]
    pub fn random() -> Self {
        Self {
            kind: IdentityKind::Player,
            token: rand::random::<u128>(),
            origin: None,
        }
    }

    /// Builds an identity from its parts. Mostly useful for tests and tools.
    pub fn from_parts(kind: IdentityKind, token: u128) -> Self {
        Self {
            kind,
            token,
            origin: None,
        }
    }

    /// The well-known identity of a process's receptionist.
    pub fn receptionist() -> Self {
        Self::from_parts(IdentityKind::System, 0)
    }

    /// Derives the well-known bot identity paired with `player`.
    ///
    /// Any process asked to resolve the result may spin up a bot on demand.
    pub fn bot_for(player: &ActorIdentity) -> Self {
        Self::from_parts(IdentityKind::Bot, player.token)
    }

    /// Whether this identity follows the bot naming scheme.
    pub fn is_bot(&self) -> bool {
        self.kind == IdentityKind::Bot
    }

    /// Returns the identity kind.
    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Returns the random token.
    pub fn token(&self) -> u128 {
        self.token
    }

    /// Returns the peer this identity was learned from, `None` if created here.
    pub fn origin(&self) -> Option<PeerId> {
        self.origin
    }

    /// Whether this identity was created in this process.
    pub fn is_local(&self) -> bool {
        self.origin.is_none()
    }

    /// Returns a copy tagged as known through `peer`.
    pub fn with_origin(self, peer: PeerId) -> Self {
        Self {
            origin: Some(peer),
            ..self
        }
    }

    /// Returns a copy with the origin tag removed.
    pub fn without_origin(self) -> Self {
        Self {
            origin: None,
            ..self
        }
    }

    /// Abbreviated form for logs and board captions.
    pub fn short(&self) -> String {
        let full = format!("{:032x}", self.token);
        format!("{}:{}", self.kind, &full[24..])
    }
}

impl PartialEq for ActorIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.token == other.token
    }
}

impl Eq for ActorIdentity {}

impl Hash for ActorIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.token.hash(state);
    }
}

impl PartialOrd for ActorIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ActorIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token
            .cmp(&other.token)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:032x}", self.kind, self.token)
    }
}

/// Failure to parse the wire form of an identity.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("Invalid actor identity {input:?}: {reason}")]
pub struct IdentityParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl std::error::Error for IdentityParseError {}

impl FromStr for ActorIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| IdentityParseError {
            input: s.to_string(),
            reason,
        };
        let (kind, token) = s.split_once(':').ok_or_else(|| fail("missing ':' separator"))?;
        let kind = kind
            .parse::<IdentityKind>()
            .map_err(|_| fail("unknown identity kind"))?;
        if token.len() != 32 {
            return Err(fail("token must be 32 hex digits"));
        }
        let token = u128::from_str_radix(token, 16).map_err(|_| fail("token is not hex"))?;
        Ok(Self::from_parts(kind, token))
    }
}

impl TryFrom<String> for ActorIdentity {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActorIdentity> for String {
    fn from(id: ActorIdentity) -> Self {
        id.to_string()
    }
}
