//! Live connections, keyed by user.
//!
//! Each connected user has exactly one current connection and an outbound
//! queue drained by that connection's writer task. Sends never block: a full
//! queue drops the event and logs a warning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chess_proto::Event;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::identity::UserRef;

pub type ConnId = u64;

/// Where a connected user currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Lobby,
    Game(String),
}

struct Client {
    conn: ConnId,
    user: UserRef,
    membership: Membership,
    tx: mpsc::Sender<Event>,
}

impl Client {
    fn push(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user = %self.user.id, "Outbound queue full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user = %self.user.id, "Outbound queue closed");
                false
            }
        }
    }
}

pub struct ConnectionManager {
    clients: DashMap<String, Client>,
    next_conn: AtomicU64,
}

/// Proof of registration. Must be handed back through [`Subscription::release`]
/// when the connection closes.
#[must_use = "a subscription must be released when its connection closes"]
pub struct Subscription {
    manager: Arc<ConnectionManager>,
    user_id: String,
    conn: ConnId,
}

impl Subscription {
    pub fn conn(&self) -> ConnId {
        self.conn
    }

    /// Unregister the connection. Returns false if it had already been
    /// superseded by a newer connection of the same user, in which case
    /// nothing is removed.
    pub fn release(self) -> bool {
        let removed = self
            .manager
            .clients
            .remove_if(&self.user_id, |_, client| client.conn == self.conn)
            .is_some();
        if removed {
            tracing::debug!(user = %self.user_id, conn = self.conn, "Connection released");
        }
        removed
    }
}

impl ConnectionManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clients: DashMap::new(),
            next_conn: AtomicU64::new(1),
        })
    }

    /// Make `tx` the current connection of `user`, starting in the lobby.
    /// A previous connection of the same user is dropped; its queue closes.
    pub fn register(self: &Arc<Self>, user: UserRef, tx: mpsc::Sender<Event>) -> Subscription {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let user_id = user.id.clone();
        let previous = self.clients.insert(
            user_id.clone(),
            Client {
                conn,
                user,
                membership: Membership::Lobby,
                tx,
            },
        );
        if let Some(previous) = previous {
            tracing::info!(user = %user_id, old = previous.conn, new = conn, "Connection superseded");
        }
        Subscription {
            manager: Arc::clone(self),
            user_id,
            conn,
        }
    }

    /// Number of distinct connected users.
    pub fn clients_counter(&self) -> usize {
        self.clients.len()
    }

    pub fn set_membership(&self, user_id: &str, membership: Membership) {
        if let Some(mut client) = self.clients.get_mut(user_id) {
            client.membership = membership;
        }
    }

    pub fn send(&self, user_id: &str, event: Event) -> bool {
        match self.clients.get(user_id) {
            Some(client) => client.push(event),
            None => false,
        }
    }

    /// Deliver to every client matching `predicate`. Returns how many
    /// accepted the event.
    pub fn broadcast<F>(&self, event: &Event, predicate: F) -> usize
    where
        F: Fn(&UserRef, &Membership) -> bool,
    {
        self.clients
            .iter()
            .filter(|entry| predicate(&entry.user, &entry.membership))
            .filter(|entry| entry.push(event.clone()))
            .count()
    }
}
