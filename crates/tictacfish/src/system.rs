//! Process-scoped actor system.
//!
//! One [`ActorSystem`] per process owns the configuration, the [`Registry`],
//! the [`Receptionist`] and every peer link. It is created once at startup and
//! passed explicitly to whatever needs it; cloning it is cheap.
//!
//! Inbound calls are dispatched by target identity: gameplay methods resolve
//! the target through the registry (activating it on demand if a handler is
//! installed), discovery methods go to the receptionist.

use crate::config::SystemConfig;
use crate::envelope::{Envelope, ListingArgs, Method};
use crate::error::ActorError;
use crate::players::{BotDifficulty, BotPlayer, GamePlayer, RemotePlayer, SharedPlayer};
use crate::receptionist::{Listing, Receptionist};
use crate::registry::{OnDemandResolver, Registry, RemoteResolver};
use crate::rpc::{InboundHandler, PeerLink};
use crate::transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tictacfish_game::{ActorIdentity, CharacterTeam, GameMove, IdentityKind, PeerId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Live links keyed by peer.
#[derive(Debug, Default)]
struct Peers {
    links: Mutex<HashMap<PeerId, Arc<PeerLink>>>,
}

impl Peers {
    fn links(&self) -> MutexGuard<'_, HashMap<PeerId, Arc<PeerLink>>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn all(&self) -> Vec<Arc<PeerLink>> {
        self.links().values().cloned().collect()
    }
}

impl RemoteResolver for Peers {
    fn proxy(&self, identity: &ActorIdentity) -> Option<SharedPlayer> {
        let peer = identity.origin()?;
        let link = self.links().get(&peer).cloned()?;
        let proxy: SharedPlayer = Arc::new(RemotePlayer::new(*identity, link));
        Some(proxy)
    }
}

/// Executes calls arriving from peers.
#[derive(Debug, Clone)]
struct Dispatcher {
    registry: Registry,
    receptionist: Receptionist,
    peers: Arc<Peers>,
    /// Bots each peer has played against, released when that peer goes away.
    served: Arc<Mutex<HashMap<PeerId, HashSet<ActorIdentity>>>>,
}

impl Dispatcher {
    fn served(&self) -> MutexGuard<'_, HashMap<PeerId, HashSet<ActorIdentity>>> {
        self.served.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn resolve_for(
        &self,
        peer: PeerId,
        target: &ActorIdentity,
    ) -> Result<SharedPlayer, ActorError> {
        let player = self.registry.resolve(target).await?;
        if target.is_bot() {
            self.served().entry(peer).or_default().insert(target.without_origin());
        }
        Ok(player)
    }

    fn listing_args(envelope: &Envelope) -> Result<ListingArgs, ActorError> {
        if envelope.target != ActorIdentity::receptionist() {
            return Err(ActorError::protocol(format!(
                "{} must target the receptionist",
                envelope.method
            )));
        }
        Ok(serde_json::from_value(envelope.arguments.clone())?)
    }
}

#[async_trait]
impl InboundHandler for Dispatcher {
    #[instrument(skip(self, link, envelope), fields(peer = %link.peer(), method = %envelope.method, target = %envelope.target.short()))]
    async fn handle(&self, link: Arc<PeerLink>, envelope: Envelope) -> Result<Value, ActorError> {
        match envelope.method {
            Method::MakeMove => {
                let player = self.resolve_for(link.peer(), &envelope.target).await?;
                let mv = player.make_move().await?;
                Ok(serde_json::to_value(mv)?)
            }
            Method::OpponentMoved => {
                let mv: GameMove = serde_json::from_value(envelope.arguments)?;
                let player = self.resolve_for(link.peer(), &envelope.target).await?;
                player.opponent_moved(mv).await?;
                Ok(Value::Null)
            }
            Method::Subscribe => {
                let args = Self::listing_args(&envelope)?;
                self.receptionist.subscribe_remote(&args.tag, link);
                Ok(Value::Null)
            }
            Method::Listed => {
                let args = Self::listing_args(&envelope)?;
                let identity = args
                    .identity
                    .ok_or_else(|| ActorError::protocol("listed without identity"))?;
                self.receptionist.check_in_remote(identity, &args.tag, &link);
                Ok(Value::Null)
            }
        }
    }

    fn connection_lost(&self, peer: PeerId) {
        self.peers.links().remove(&peer);
        self.receptionist.peer_lost(peer);
        let served = self.served().remove(&peer).unwrap_or_default();
        let released = served.iter().filter(|bot| self.registry.release(bot)).count();
        info!(%peer, released, "Peer disconnected");
    }
}

#[derive(Debug)]
struct Inner {
    config: SystemConfig,
    dispatcher: Dispatcher,
    next_peer: AtomicU64,
}

/// Handle to this process's registry, receptionist and connections.
#[derive(Debug, Clone)]
pub struct ActorSystem {
    inner: Arc<Inner>,
}

impl ActorSystem {
    /// Creates a system with no connections and no on-demand handler.
    #[instrument(skip(config), fields(address = %config.address()))]
    pub fn new(config: SystemConfig) -> Self {
        let peers = Arc::new(Peers::default());
        let registry = Registry::new();
        registry.set_remote(peers.clone());
        info!("Actor system ready");
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher: Dispatcher {
                    registry,
                    receptionist: Receptionist::new(),
                    peers,
                    served: Arc::default(),
                },
                next_peer: AtomicU64::new(1),
            }),
        }
    }

    /// Configuration the system was built with.
    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// The process registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.dispatcher.registry
    }

    /// The process receptionist.
    pub fn receptionist(&self) -> &Receptionist {
        &self.inner.dispatcher.receptionist
    }

    fn peers(&self) -> &Peers {
        &self.inner.dispatcher.peers
    }

    /// Installs the on-demand handler.
    pub fn on_demand(&self, resolver: Arc<dyn OnDemandResolver>) {
        self.registry().set_on_demand(resolver);
    }

    /// Installs a handler that spins up a bot for any bot identity.
    #[instrument(skip(self))]
    pub fn install_bot_resolver(&self, team: CharacterTeam, difficulty: BotDifficulty) {
        self.on_demand(Arc::new(move |identity: &ActorIdentity| -> Option<SharedPlayer> {
            if !identity.is_bot() {
                return None;
            }
            let bot: SharedPlayer = Arc::new(BotPlayer::with_difficulty(
                identity.without_origin(),
                team,
                difficulty,
            ));
            Some(bot)
        }));
    }

    /// Registers a local participant and returns its identity.
    pub fn spawn_player(&self, player: SharedPlayer) -> Result<ActorIdentity, ActorError> {
        let id = player.id();
        self.registry().register(id, player)?;
        Ok(id)
    }

    /// Resolves an identity to a local participant or a remote proxy.
    pub async fn resolve(&self, identity: &ActorIdentity) -> Result<SharedPlayer, ActorError> {
        self.registry().resolve(identity).await
    }

    /// Makes a local identity discoverable under `tag`, here and on subscribed peers.
    pub fn check_in(&self, identity: ActorIdentity, tag: &str) {
        self.receptionist().check_in(identity, tag);
    }

    /// Subscribes to `tag` locally and on every connected peer.
    ///
    /// Peers attached later are asked as well while the listing is alive.
    #[instrument(skip(self))]
    pub fn listing(&self, kind: IdentityKind, tag: &str) -> Listing {
        let listing = self.receptionist().listing(kind, tag);
        for link in self.peers().all() {
            subscribe(&link, tag);
        }
        listing
    }

    /// Runs the connection tasks for an already-established stream.
    #[instrument(skip(self, stream))]
    pub fn attach<S>(&self, stream: S) -> Arc<PeerLink>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = PeerId(self.inner.next_peer.fetch_add(1, Ordering::Relaxed));
        let link = transport::spawn_connection(
            stream,
            peer,
            self.config().call_timeout(),
            *self.config().max_frame_bytes(),
            Arc::new(self.inner.dispatcher.clone()),
        );
        self.peers().links().insert(peer, link.clone());
        if link.is_closed() {
            self.peers().links().remove(&peer);
            return link;
        }

        for tag in self.receptionist().subscribed_tags() {
            subscribe(&link, &tag);
        }
        info!(%peer, "Peer attached");
        link
    }

    /// Accepts connections on `address` until the process ends.
    ///
    /// # Errors
    ///
    /// [`ActorError::ConfigurationFatal`] if the address cannot be bound.
    #[instrument(skip(self))]
    pub async fn listen(&self, address: &str) -> Result<SocketAddr, ActorError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ActorError::fatal(format!("cannot listen on {address}: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| ActorError::fatal(format!("cannot read bound address: {e}")))?;
        info!(%local, "Listening");

        let system = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%remote, error = %e, "Could not set nodelay");
                        }
                        debug!(%remote, "Accepted connection");
                        system.attach(stream);
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed, backing off");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        });
        Ok(local)
    }

    /// Connects to a listening process.
    ///
    /// # Errors
    ///
    /// [`ActorError::ConfigurationFatal`] if the peer cannot be reached.
    pub async fn connect(&self, address: &str) -> Result<Arc<PeerLink>, ActorError> {
        let stream = transport::dial(address).await?;
        Ok(self.attach(stream))
    }

    /// Closes the link to `peer`, failing its outstanding calls.
    #[instrument(skip(self))]
    pub fn disconnect(&self, peer: PeerId) -> bool {
        let Some(link) = self.peers().links().remove(&peer) else {
            return false;
        };
        link.close();
        self.inner.dispatcher.connection_lost(peer);
        true
    }

    /// Link to `peer`, if connected.
    pub fn link(&self, peer: PeerId) -> Option<Arc<PeerLink>> {
        self.peers().links().get(&peer).cloned()
    }

    /// Number of connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers().links().len()
    }
}

fn subscribe(link: &PeerLink, tag: &str) {
    let args = ListingArgs {
        tag: tag.to_string(),
        identity: None,
    };
    let sent = serde_json::to_value(args)
        .map_err(ActorError::from)
        .and_then(|args| link.notify(ActorIdentity::receptionist(), Method::Subscribe, args));
    if let Err(e) = sent {
        warn!(peer = %link.peer(), tag, error = %e, "Subscribe not sent");
    }
}
