//! Tag-based discovery directory.
//!
//! Participants check in under a tag. A [`Listing`] first yields every
//! identity already checked in under its tag and then each later check-in, in
//! order. Subscribers can be local streams or peer links; entries learned from
//! a peer are dropped when that peer's connection goes away.

use crate::envelope::{ListingArgs, Method};
use crate::error::ActorError;
use crate::rpc::PeerLink;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tictacfish_game::{ActorIdentity, IdentityKind, PeerId};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
struct Entry {
    identity: ActorIdentity,
    source: Option<PeerId>,
}

#[derive(Debug)]
enum Subscriber {
    Local {
        kind: IdentityKind,
        tx: mpsc::UnboundedSender<ActorIdentity>,
    },
    Remote(Arc<PeerLink>),
}

impl Subscriber {
    /// Delivers `identity`; returns false once the subscriber is gone.
    fn deliver(&self, tag: &str, identity: ActorIdentity) -> bool {
        match self {
            Subscriber::Local { kind, tx } => {
                identity.kind() != *kind || tx.send(identity).is_ok()
            }
            Subscriber::Remote(link) => {
                let args = ListingArgs {
                    tag: tag.to_string(),
                    identity: Some(identity.without_origin()),
                };
                let sent = serde_json::to_value(args)
                    .map_err(ActorError::from)
                    .and_then(|args| link.notify(ActorIdentity::receptionist(), Method::Listed, args));
                match sent {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(peer = %link.peer(), error = %e, "Dropping remote subscriber");
                        false
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Directory {
    entries: HashMap<String, Vec<Entry>>,
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl Directory {
    fn add(&mut self, tag: &str, entry: Entry, include_remote: bool) -> bool {
        let entries = self.entries.entry(tag.to_string()).or_default();
        if entries.iter().any(|e| e.identity == entry.identity) {
            return false;
        }
        entries.push(entry);

        if let Some(subscribers) = self.subscribers.get_mut(tag) {
            subscribers.retain(|subscriber| match subscriber {
                Subscriber::Remote(_) if !include_remote => true,
                _ => subscriber.deliver(tag, entry.identity),
            });
        }
        true
    }
}

/// Stream of identities checked in under one tag.
#[derive(Debug)]
pub struct Listing {
    tag: String,
    rx: mpsc::UnboundedReceiver<ActorIdentity>,
}

impl Listing {
    /// Tag this listing follows.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Stream for Listing {
    type Item = ActorIdentity;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Shared handle to this process's discovery directory.
#[derive(Debug, Clone, Default)]
pub struct Receptionist {
    directory: Arc<Mutex<Directory>>,
}

impl Receptionist {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes a local identity discoverable under `tag`.
    ///
    /// Idempotent per (identity, tag). New entries are broadcast to every
    /// subscriber of the tag, local or remote.
    #[instrument(skip(self), fields(identity = %identity.short()))]
    pub fn check_in(&self, identity: ActorIdentity, tag: &str) {
        let entry = Entry {
            identity: identity.without_origin(),
            source: None,
        };
        if self.directory().add(tag, entry, true) {
            info!("Checked in");
        } else {
            debug!("Already checked in");
        }
    }

    /// Records an identity announced over `link`; broadcast to local subscribers only.
    ///
    /// Announcements handled after `link` closed are ignored. The check runs
    /// under the directory lock, and links close before
    /// [`Receptionist::peer_lost`] runs for their peer.
    #[instrument(skip(self, link), fields(identity = %identity.short(), peer = %link.peer()))]
    pub fn check_in_remote(&self, identity: ActorIdentity, tag: &str, link: &PeerLink) {
        let peer = link.peer();
        let entry = Entry {
            identity: identity.with_origin(peer),
            source: Some(peer),
        };
        let mut directory = self.directory();
        if link.is_closed() {
            debug!("Ignoring entry from closed link");
            return;
        }
        if directory.add(tag, entry, false) {
            debug!("Learned remote entry");
        }
    }

    /// Removes `identity` from `tag`. Returns whether it was listed.
    #[instrument(skip(self), fields(identity = %identity.short()))]
    pub fn check_out(&self, identity: &ActorIdentity, tag: &str) -> bool {
        let mut directory = self.directory();
        let Some(entries) = directory.entries.get_mut(tag) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.identity != *identity);
        before != entries.len()
    }

    /// Subscribes to identities of `kind` under `tag`.
    ///
    /// The snapshot and the live registration happen under one lock, so no
    /// check-in is missed or duplicated between the two.
    #[instrument(skip(self))]
    pub fn listing(&self, kind: IdentityKind, tag: &str) -> Listing {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut directory = self.directory();
        let snapshot: Vec<_> = directory
            .entries
            .get(tag)
            .into_iter()
            .flatten()
            .filter(|e| e.identity.kind() == kind)
            .map(|e| e.identity)
            .collect();
        debug!(snapshot = snapshot.len(), "Listing subscribed");
        for identity in snapshot {
            let _ = tx.send(identity);
        }
        directory
            .subscribers
            .entry(tag.to_string())
            .or_default()
            .push(Subscriber::Local { kind, tx });
        Listing {
            tag: tag.to_string(),
            rx,
        }
    }

    /// Streams local check-ins under `tag` to a peer.
    ///
    /// Only entries checked in by this process are forwarded, so announcements
    /// never bounce back to the peer they came from.
    #[instrument(skip(self, link), fields(peer = %link.peer()))]
    pub fn subscribe_remote(&self, tag: &str, link: Arc<PeerLink>) {
        let mut directory = self.directory();
        if link.is_closed() {
            debug!("Ignoring subscription from closed link");
            return;
        }
        let subscriber = Subscriber::Remote(link);
        let local: Vec<_> = directory
            .entries
            .get(tag)
            .into_iter()
            .flatten()
            .filter(|e| e.source.is_none())
            .map(|e| e.identity)
            .collect();
        for identity in local {
            if !subscriber.deliver(tag, identity) {
                warn!("Peer gone before snapshot was delivered");
                return;
            }
        }
        directory
            .subscribers
            .entry(tag.to_string())
            .or_default()
            .push(subscriber);
        debug!("Remote subscriber added");
    }

    /// Invalidates every entry and subscription sourced from `peer`.
    #[instrument(skip(self))]
    pub fn peer_lost(&self, peer: PeerId) {
        let mut directory = self.directory();
        let mut removed = 0usize;
        for entries in directory.entries.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.source != Some(peer));
            removed += before - entries.len();
        }
        for subscribers in directory.subscribers.values_mut() {
            subscribers.retain(|s| !matches!(s, Subscriber::Remote(link) if link.peer() == peer));
        }
        info!(removed, "Dropped entries of lost peer");
    }

    /// Identities currently listed under `tag`, in check-in order.
    pub fn entries(&self, tag: &str) -> Vec<ActorIdentity> {
        self.directory()
            .entries
            .get(tag)
            .map(|entries| entries.iter().map(|e| e.identity).collect())
            .unwrap_or_default()
    }

    /// Tags with at least one live local subscriber.
    pub fn subscribed_tags(&self) -> Vec<String> {
        self.directory()
            .subscribers
            .iter()
            .filter(|(_, subscribers)| {
                subscribers
                    .iter()
                    .any(|s| matches!(s, Subscriber::Local { tx, .. } if !tx.is_closed()))
            })
            .map(|(tag, _)| tag.clone())
            .collect()
    }
}
