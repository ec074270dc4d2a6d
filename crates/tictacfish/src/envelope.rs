//! Wire envelope for remote invocations.
//!
//! Every frame on a connection holds exactly one JSON-encoded [`Envelope`].
//! The `version` field lets newer peers add fields: unknown fields are
//! ignored on decode and only version `0` is rejected as malformed.

use crate::error::{ActorError, RemoteFailure};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tictacfish_game::ActorIdentity;

/// Current envelope encoding version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Identifier correlating a request with its response on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(pub u64);

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Remotely invocable operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    /// `GamePlayer::make_move`.
    MakeMove,
    /// `GamePlayer::opponent_moved`.
    OpponentMoved,
    /// Ask a peer's receptionist to stream its listing for a tag.
    Subscribe,
    /// A receptionist announcing one listed identity to a subscriber.
    Listed,
}

/// Whether an envelope expects, answers, or ignores replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Expects a [`EnvelopeKind::Response`] with the same call id.
    Request,
    /// Answers a request.
    Response,
    /// Fire-and-forget.
    OneWay,
}

/// One remote invocation, response, or notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Encoding version of the sender.
    pub version: u16,
    /// Participant the call is addressed to.
    pub target: ActorIdentity,
    /// Correlation id, unique among the sender's outstanding calls.
    pub call_id: CallId,
    /// Operation tag.
    pub method: Method,
    /// Method arguments, or a [`CallOutcome`] for responses.
    #[serde(default)]
    pub arguments: Value,
    /// Request, response, or one-way.
    pub kind: EnvelopeKind,
}

impl Envelope {
    /// Builds a request envelope.
    pub fn request(target: ActorIdentity, call_id: CallId, method: Method, arguments: Value) -> Self {
        Self::build(target, call_id, method, arguments, EnvelopeKind::Request)
    }

    /// Builds a one-way envelope.
    pub fn one_way(target: ActorIdentity, call_id: CallId, method: Method, arguments: Value) -> Self {
        Self::build(target, call_id, method, arguments, EnvelopeKind::OneWay)
    }

    /// Builds the response to `self` carrying `outcome`.
    pub fn respond(&self, outcome: &Result<Value, ActorError>) -> Result<Self, ActorError> {
        let outcome = match outcome {
            Ok(value) => CallOutcome::Ok {
                value: value.clone(),
            },
            Err(err) => CallOutcome::Err {
                failure: RemoteFailure::from(err),
            },
        };
        Ok(Self::build(
            self.target,
            self.call_id,
            self.method,
            serde_json::to_value(outcome)?,
            EnvelopeKind::Response,
        ))
    }

    fn build(
        target: ActorIdentity,
        call_id: CallId,
        method: Method,
        arguments: Value,
        kind: EnvelopeKind,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            target: target.without_origin(),
            call_id,
            method,
            arguments,
            kind,
        }
    }

    /// Serializes to frame payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ActorError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses frame payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ActorError> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        if envelope.version == 0 {
            return Err(ActorError::protocol("envelope version 0 is not valid"));
        }
        Ok(envelope)
    }

    /// Interprets a response envelope's arguments.
    pub fn into_outcome(self) -> Result<Value, ActorError> {
        match serde_json::from_value::<CallOutcome>(self.arguments)? {
            CallOutcome::Ok { value } => Ok(value),
            CallOutcome::Err { failure } => Err(failure.into()),
        }
    }
}

/// Payload of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call succeeded.
    Ok {
        /// Serialized return value.
        value: Value,
    },
    /// The call failed.
    Err {
        /// Why.
        failure: RemoteFailure,
    },
}

/// Arguments of [`Method::Subscribe`] and [`Method::Listed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingArgs {
    /// Receptionist tag.
    pub tag: String,
    /// Listed identity; absent for subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ActorIdentity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tictacfish_game::IllegalMove;

    #[test]
    fn test_request_survives_encoding() {
        let target = ActorIdentity::bot_for(&ActorIdentity::random());
        let request = Envelope::request(target, CallId(17), Method::OpponentMoved, json!({"position": 4}));
        let decoded = Envelope::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.target, target);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let bytes = br#"{"version":2,"target":"bot:0000000000000000000000000000000a","call_id":4,
            "method":"make_move","arguments":null,"kind":"request","deadline_ms":100}"#;
        let envelope = Envelope::decode(bytes).unwrap();
        assert_eq!(envelope.version, 2);
        assert_eq!(envelope.method, Method::MakeMove);
        assert_eq!(envelope.call_id, CallId(4));
    }

    #[test]
    fn test_version_zero_rejected() {
        let bytes = br#"{"version":0,"target":"bot:0000000000000000000000000000000a","call_id":4,
            "method":"make_move","arguments":null,"kind":"request"}"#;
        assert!(matches!(Envelope::decode(bytes), Err(ActorError::Protocol { .. })));
    }

    #[test]
    fn test_error_response_rebuilds_error() {
        let request = Envelope::request(ActorIdentity::random(), CallId(9), Method::OpponentMoved, json!({}));
        let response = request
            .respond(&Err(ActorError::IllegalMove(IllegalMove::GameOver)))
            .unwrap();
        assert_eq!(response.kind, EnvelopeKind::Response);
        assert_eq!(response.call_id, CallId(9));
        assert_eq!(
            response.into_outcome(),
            Err(ActorError::IllegalMove(IllegalMove::GameOver))
        );
    }
}
