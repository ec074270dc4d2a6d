//! Proxy for a participant hosted by another process.

use super::GamePlayer;
use crate::envelope::Method;
use crate::error::ActorError;
use crate::rpc::PeerLink;
use serde_json::Value;
use std::sync::Arc;
use tictacfish_game::{ActorIdentity, GameMove};
use tracing::instrument;

/// Forwards every call over a peer link and awaits the remote result.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    id: ActorIdentity,
    link: Arc<PeerLink>,
}

impl RemotePlayer {
    /// Creates a proxy for `id` reachable through `link`.
    pub fn new(id: ActorIdentity, link: Arc<PeerLink>) -> Self {
        Self {
            id: id.with_origin(link.peer()),
            link,
        }
    }

    /// Link this proxy forwards over.
    pub fn link(&self) -> &Arc<PeerLink> {
        &self.link
    }
}

#[async_trait::async_trait]
impl GamePlayer for RemotePlayer {
    fn id(&self) -> ActorIdentity {
        self.id
    }

    #[instrument(skip(self), fields(id = %self.id.short(), peer = %self.link.peer()))]
    async fn make_move(&self) -> Result<GameMove, ActorError> {
        let value = self.link.call(self.id, Method::MakeMove, Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self), fields(id = %self.id.short(), peer = %self.link.peer()))]
    async fn opponent_moved(&self, mv: GameMove) -> Result<(), ActorError> {
        self.link
            .call(self.id, Method::OpponentMoved, serde_json::to_value(mv)?)
            .await?;
        Ok(())
    }
}
