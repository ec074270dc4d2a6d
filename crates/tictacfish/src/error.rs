//! Error taxonomy of the actor system.

use serde::{Deserialize, Serialize};
use tictacfish_game::{ActorIdentity, IllegalMove, PeerId};

/// Failure of an actor-system or participant operation.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum ActorError {
    /// The board state machine rejected a move.
    #[display("Illegal move: {}", _0)]
    IllegalMove(IllegalMove),

    /// A bot found no legal move to make.
    #[display("No move available")]
    #[from(ignore)]
    NoMoveAvailable,

    /// Neither the registry nor the on-demand handler could resolve an identity.
    #[display("Unknown identity {}", _0)]
    #[from(ignore)]
    UnknownIdentity(ActorIdentity),

    /// The identity is already bound in this registry.
    #[display("Identity {} is already registered", _0)]
    #[from(ignore)]
    DuplicateIdentity(ActorIdentity),

    /// The connection carrying a call went away.
    #[display("Connection to {} lost", _0)]
    #[from(ignore)]
    ConnectionLost(PeerId),

    /// A remote call did not complete in time.
    #[display("Call {method} timed out after {after_ms}ms")]
    #[from(ignore)]
    Timeout {
        /// Method tag of the call.
        method: String,
        /// Configured bound, in milliseconds.
        after_ms: u64,
    },

    /// The process cannot run with its configuration (e.g. server unreachable).
    #[display("Fatal configuration error: {reason}")]
    #[from(ignore)]
    ConfigurationFatal {
        /// What went wrong.
        reason: String,
    },

    /// A frame, envelope or argument payload could not be understood.
    #[display("Protocol error: {reason}")]
    #[from(ignore)]
    Protocol {
        /// What went wrong.
        reason: String,
    },

    /// Any other failure reported by a remote peer.
    #[display("Remote failure: {message}")]
    #[from(ignore)]
    Remote {
        /// Remote error text.
        message: String,
    },

    /// The source of human input was dropped.
    #[display("Input channel closed")]
    #[from(ignore)]
    InputClosed,

    /// A discovery listing ended before it produced what was needed.
    #[display("Listing for {tag} closed")]
    #[from(ignore)]
    ListingClosed {
        /// Receptionist tag of the listing.
        tag: String,
    },
}

impl std::error::Error for ActorError {}

impl ActorError {
    /// Creates a protocol error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a fatal configuration error.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::ConfigurationFatal {
            reason: reason.into(),
        }
    }

    /// Whether the error is a rejected game-rule update.
    pub fn is_illegal_move(&self) -> bool {
        matches!(self, Self::IllegalMove(_))
    }
}

impl From<serde_json::Error> for ActorError {
    fn from(err: serde_json::Error) -> Self {
        Self::protocol(err.to_string())
    }
}

/// Wire form of a failed call, carried inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteFailure {
    /// See [`ActorError::IllegalMove`].
    IllegalMove {
        /// The rejection.
        reason: IllegalMove,
    },
    /// See [`ActorError::NoMoveAvailable`].
    NoMoveAvailable,
    /// See [`ActorError::UnknownIdentity`].
    UnknownIdentity {
        /// The identity that failed to resolve.
        identity: ActorIdentity,
    },
    /// Anything else, flattened to text.
    Other {
        /// Remote error text.
        message: String,
    },
}

impl From<&ActorError> for RemoteFailure {
    fn from(err: &ActorError) -> Self {
        match err {
            ActorError::IllegalMove(reason) => Self::IllegalMove { reason: *reason },
            ActorError::NoMoveAvailable => Self::NoMoveAvailable,
            ActorError::UnknownIdentity(identity) => Self::UnknownIdentity {
                identity: *identity,
            },
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<RemoteFailure> for ActorError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::IllegalMove { reason } => Self::IllegalMove(reason),
            RemoteFailure::NoMoveAvailable => Self::NoMoveAvailable,
            RemoteFailure::UnknownIdentity { identity } => Self::UnknownIdentity(identity),
            RemoteFailure::Other { message } => Self::Remote { message },
        }
    }
}
