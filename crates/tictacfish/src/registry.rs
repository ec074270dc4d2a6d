//! Per-process table binding identities to live participants.
//!
//! All mutation goes through one lock. Activation through the on-demand
//! handler is additionally funnelled through a per-identity [`OnceCell`], so
//! concurrent resolves of the same unbound identity run the handler once and
//! all observe the same instance.

use crate::error::ActorError;
use crate::players::SharedPlayer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tictacfish_game::ActorIdentity;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Lazily creates participants the first time their identity is referenced.
#[async_trait]
pub trait OnDemandResolver: Send + Sync + 'static {
    /// Returns a new participant for `identity`, or `None` if it cannot be
    /// created in this process.
    async fn resolve(&self, identity: &ActorIdentity) -> Option<SharedPlayer>;
}

#[async_trait]
impl<F> OnDemandResolver for F
where
    F: Fn(&ActorIdentity) -> Option<SharedPlayer> + Send + Sync + 'static,
{
    async fn resolve(&self, identity: &ActorIdentity) -> Option<SharedPlayer> {
        self(identity)
    }
}

/// Produces proxies for identities hosted elsewhere.
pub trait RemoteResolver: Send + Sync + 'static {
    /// Returns a proxy for `identity`, or `None` if no route to it is known.
    fn proxy(&self, identity: &ActorIdentity) -> Option<SharedPlayer>;
}

/// Lifecycle state of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// The on-demand handler is running for this identity.
    Pending,
    /// Bound to a live participant.
    Active,
    /// Released by its session.
    Released,
}

type Activation = Arc<OnceCell<Option<SharedPlayer>>>;

enum Slot {
    Pending(Activation),
    Active(SharedPlayer),
    Released,
}

impl Slot {
    fn state(&self) -> ActivationState {
        match self {
            Slot::Pending(_) => ActivationState::Pending,
            Slot::Active(_) => ActivationState::Active,
            Slot::Released => ActivationState::Released,
        }
    }
}

/// Shared handle to this process's identity table.
#[derive(Clone, Default)]
pub struct Registry {
    slots: Arc<Mutex<HashMap<ActorIdentity, Slot>>>,
    on_demand: Arc<RwLock<Option<Arc<dyn OnDemandResolver>>>>,
    remote: Arc<RwLock<Option<Arc<dyn RemoteResolver>>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.slots().len())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry with no on-demand handler.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating registry");
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ActorIdentity, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_demand(&self) -> Option<Arc<dyn OnDemandResolver>> {
        self.on_demand
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remote(&self) -> Option<Arc<dyn RemoteResolver>> {
        self.remote
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs the process's single on-demand handler, replacing any previous one.
    pub fn set_on_demand(&self, resolver: Arc<dyn OnDemandResolver>) {
        *self.on_demand.write().unwrap_or_else(PoisonError::into_inner) = Some(resolver);
        debug!("On-demand resolver installed");
    }

    /// Installs the fallback used for identities known to live on a peer.
    pub fn set_remote(&self, resolver: Arc<dyn RemoteResolver>) {
        *self.remote.write().unwrap_or_else(PoisonError::into_inner) = Some(resolver);
    }

    /// Binds an activated participant to `identity`.
    ///
    /// # Errors
    ///
    /// [`ActorError::DuplicateIdentity`] if the identity is active or being activated.
    #[instrument(skip(self, instance), fields(identity = %identity.short()))]
    pub fn register(&self, identity: ActorIdentity, instance: SharedPlayer) -> Result<(), ActorError> {
        let mut slots = self.slots();
        if let Some(Slot::Active(_) | Slot::Pending(_)) = slots.get(&identity) {
            warn!("Identity already bound");
            return Err(ActorError::DuplicateIdentity(identity));
        }
        slots.insert(identity.without_origin(), Slot::Active(instance));
        debug!("Registered");
        Ok(())
    }

    /// Returns the locally bound participant, if any.
    pub fn lookup_local(&self, identity: &ActorIdentity) -> Option<SharedPlayer> {
        match self.slots().get(identity) {
            Some(Slot::Active(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Current lifecycle state of `identity`, `None` if never seen.
    pub fn activation_state(&self, identity: &ActorIdentity) -> Option<ActivationState> {
        self.slots().get(identity).map(Slot::state)
    }

    /// Number of active bindings.
    pub fn active_count(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    /// Resolves `identity` to a participant.
    ///
    /// Looks in the local table first, then runs the on-demand handler (at most
    /// once per unbound identity), then falls back to a remote proxy when the
    /// identity carries a peer origin.
    ///
    /// # Errors
    ///
    /// [`ActorError::UnknownIdentity`] if every step comes up empty.
    #[instrument(skip(self), fields(identity = %identity.short()))]
    pub async fn resolve(&self, identity: &ActorIdentity) -> Result<SharedPlayer, ActorError> {
        let Some(resolver) = self.on_demand() else {
            if let Some(instance) = self.lookup_local(identity) {
                return Ok(instance);
            }
            return self.resolve_remote(identity);
        };

        let activation = {
            let mut slots = self.slots();
            match slots.get(identity) {
                Some(Slot::Active(instance)) => return Ok(instance.clone()),
                Some(Slot::Pending(activation)) => activation.clone(),
                Some(Slot::Released) | None => {
                    let activation = Activation::default();
                    slots.insert(identity.without_origin(), Slot::Pending(activation.clone()));
                    activation
                }
            }
        };

        let resolved = activation
            .get_or_init(|| async {
                debug!("Running on-demand resolver");
                resolver.resolve(identity).await
            })
            .await
            .clone();

        {
            let mut slots = self.slots();
            let still_ours = matches!(
                slots.get(identity),
                Some(Slot::Pending(current)) if Arc::ptr_eq(current, &activation)
            );
            if still_ours {
                match &resolved {
                    Some(instance) => {
                        info!("Activated on demand");
                        slots.insert(identity.without_origin(), Slot::Active(instance.clone()));
                    }
                    None => {
                        slots.remove(identity);
                    }
                }
            }
        }

        match resolved {
            Some(instance) => Ok(instance),
            None => self.resolve_remote(identity),
        }
    }

    fn resolve_remote(&self, identity: &ActorIdentity) -> Result<SharedPlayer, ActorError> {
        if identity.origin().is_some()
            && let Some(proxy) = self.remote().and_then(|remote| remote.proxy(identity))
        {
            debug!(origin = ?identity.origin(), "Resolved to remote proxy");
            return Ok(proxy);
        }
        debug!("Identity not resolvable");
        Err(ActorError::UnknownIdentity(*identity))
    }

    /// Releases an active binding. Returns whether anything was released.
    ///
    /// With an on-demand handler installed the entry stays behind as
    /// [`ActivationState::Released`] until the next resolve re-activates it.
    /// Without one the entry is removed.
    #[instrument(skip(self), fields(identity = %identity.short()))]
    pub fn release(&self, identity: &ActorIdentity) -> bool {
        let reactivatable = self.on_demand().is_some();
        let mut slots = self.slots();
        if !matches!(slots.get(identity), Some(Slot::Active(_))) {
            return false;
        }
        if reactivatable {
            slots.insert(identity.without_origin(), Slot::Released);
        } else {
            slots.remove(identity);
        }
        info!(reactivatable, "Released");
        true
    }
}
