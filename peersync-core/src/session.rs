// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session
//!
//! The network aggregate: owns the signaling backend, the peer identity,
//! hosting mode and admission policy, the connection table, the event
//! registry, and the synced-object table.
//!
//! The session is driven from two entry points. [`Session::pump`] drains
//! backend events (identity outcomes, connection lifecycle, inbound data)
//! and flushes queued local synced-object changes; [`Session::tick`] runs
//! heartbeat maintenance and grace-delayed transport closes and is meant
//! to be called about once per second. Both have `*_at(now)` variants
//! taking an explicit instant, which makes every timing property
//! deterministic under test.
//!
//! Exactly one session is a host; clients hold at most one connection, to
//! that host. Mutations of synced objects flow client -> host -> all other
//! clients; the host is the only relay (star topology).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::SessionError;
use crate::events::{EventDispatcher, EventKind, SessionEvent};
use crate::peer::{PeerRole, PeerSession, CLOSE_GRACE};
use crate::protocol::{self, Inbound, SyncMessage};
use crate::signaling::{ConnectionId, SignalingBackend, SignalingEvent};
use crate::tracked::TrackedValue;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum simultaneously admitted clients while hosting.
    pub max_clients: usize,
    /// Whether inbound connections are considered at all.
    pub accept_connections: bool,
    /// Whether admission requires whitelist membership.
    pub use_whitelist: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_clients: 8,
            accept_connections: true,
            use_whitelist: false,
        }
    }
}

/// A locally made synced-object mutation awaiting broadcast.
struct LocalChange {
    uuid: String,
    path: Vec<String>,
    value: Value,
}

type ChangeQueue = Arc<Mutex<VecDeque<LocalChange>>>;

/// A transport close scheduled after the CLOSE-notice grace delay.
struct PendingClose {
    conn: ConnectionId,
    deadline: Instant,
}

/// A peer-to-peer session: identity, admission policy, connections, and
/// synced objects.
pub struct Session<B: SignalingBackend> {
    backend: B,
    id: Option<String>,
    identity_requested: bool,
    hosting: bool,
    max_clients: usize,
    accept_connections: bool,
    use_whitelist: bool,
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
    /// Peer id -> live peer session. At most one entry while not hosting.
    connections: HashMap<String, PeerSession>,
    /// Connection handle -> peer id, for inbound routing.
    routes: HashMap<ConnectionId, String>,
    pending_closes: Vec<PendingClose>,
    dispatcher: EventDispatcher,
    /// Uuid -> live tracker.
    synced: HashMap<String, TrackedValue>,
    /// Outbound mutations queued by tracker callbacks, flushed on pump.
    changes: ChangeQueue,
}

impl<B: SignalingBackend> Session<B> {
    /// Creates a session with default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    /// Creates a session with the given configuration.
    pub fn with_config(backend: B, config: SessionConfig) -> Self {
        Session {
            backend,
            id: None,
            identity_requested: false,
            hosting: false,
            max_clients: config.max_clients,
            accept_connections: config.accept_connections,
            use_whitelist: config.use_whitelist,
            whitelist: HashSet::new(),
            blacklist: HashSet::new(),
            connections: HashMap::new(),
            routes: HashMap::new(),
            pending_closes: Vec::new(),
            dispatcher: EventDispatcher::new(),
            synced: HashMap::new(),
            changes: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Requests identity assignment from the signaling collaborator.
    ///
    /// The outcome arrives on a later pump as `IdentityOpened`,
    /// `IdUnavailable`, or `IdInvalid`. A failed request may be retried
    /// with a different id; a successful one fixes the identity for the
    /// session's lifetime.
    pub fn start(&mut self, requested_id: &str) -> Result<(), SessionError> {
        if self.id.is_some() || self.identity_requested {
            return Err(SessionError::AlreadyStarted);
        }
        self.identity_requested = true;
        self.backend.request_identity(requested_id);
        Ok(())
    }

    /// Registers an event handler; handlers for one kind run in
    /// registration order on every occurrence.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&SessionEvent) + Send + 'static,
    {
        self.dispatcher.on(kind, handler);
    }

    /// Drains backend events and flushes queued synced-object changes.
    /// Returns the number of backend events processed.
    pub fn pump(&mut self) -> usize {
        self.pump_at(Instant::now())
    }

    /// [`Session::pump`] with an explicit current instant.
    pub fn pump_at(&mut self, now: Instant) -> usize {
        let mut processed = 0;
        while let Some(event) = self.backend.poll() {
            processed += 1;
            self.handle_signal(event, now);
        }
        self.flush_changes();
        processed
    }

    /// Heartbeat maintenance; call about once per second.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now())
    }

    /// [`Session::tick`] with an explicit current instant.
    ///
    /// Staleness is checked before keep-alives are sent: a peer silent for
    /// longer than [`crate::peer::HEARTBEAT_TIMEOUT`] is torn down —
    /// including one stuck in the connecting state whose transport never
    /// reported anything — and every other open peer gets an IAMHERE when
    /// one is due. Finally, transport closes whose grace delay expired are
    /// executed.
    pub fn tick_at(&mut self, now: Instant) {
        let stale: Vec<String> = self
            .connections
            .values()
            .filter(|p| p.stale_at(now))
            .map(|p| p.peer_id().to_string())
            .collect();
        for peer_id in stale {
            self.close_peer(&peer_id, now);
        }

        for peer in self.connections.values_mut() {
            if peer.is_open() && peer.take_heartbeat_due(now) {
                self.backend.send(peer.conn(), protocol::IAMHERE);
            }
        }

        let mut due = Vec::new();
        self.pending_closes.retain(|pending| {
            if pending.deadline <= now {
                due.push(pending.conn);
                false
            } else {
                true
            }
        });
        for conn in due {
            self.backend.close(conn);
        }
    }

    /// Gracefully closes every connection.
    pub fn shutdown(&mut self) {
        self.close_all_connections();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The assigned identity, once `IdentityOpened` has fired.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_hosting(&self) -> bool {
        self.hosting
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ids of all peers currently in the connection table, admitted or
    /// still in admission.
    pub fn peer_ids(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// The live tracker for a synced object. Clones are handles onto the
    /// same underlying value, so repeated lookups never diverge.
    pub fn synced(&self, uuid: &str) -> Option<TrackedValue> {
        self.synced.get(uuid).cloned()
    }

    pub fn synced_uuids(&self) -> Vec<String> {
        self.synced.keys().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Hosting & admission policy
    // ------------------------------------------------------------------

    /// Switches into hosting mode. Returns the resulting hosting flag so
    /// callers can detect a refused toggle.
    ///
    /// With `abort_if_connected` the toggle is refused without side
    /// effects while connections exist; otherwise all connections are
    /// force-closed first, so a mode change always starts from zero
    /// connections.
    pub fn enable_hosting(&mut self, abort_if_connected: bool) -> bool {
        if self.hosting {
            return true;
        }
        if !self.connections.is_empty() {
            if abort_if_connected {
                return self.hosting;
            }
            self.close_all_connections();
        }
        self.hosting = true;
        self.hosting
    }

    /// Switches out of hosting mode; same refusal/teardown rules as
    /// [`Session::enable_hosting`].
    pub fn disable_hosting(&mut self, abort_if_connected: bool) -> bool {
        if !self.hosting {
            return false;
        }
        if !self.connections.is_empty() {
            if abort_if_connected {
                return self.hosting;
            }
            self.close_all_connections();
        }
        self.hosting = false;
        self.hosting
    }

    pub fn set_max_clients(&mut self, max_clients: usize) {
        self.max_clients = max_clients;
    }

    pub fn set_accept_connections(&mut self, accept: bool) {
        self.accept_connections = accept;
    }

    pub fn set_use_whitelist(&mut self, use_whitelist: bool) {
        self.use_whitelist = use_whitelist;
    }

    /// Adds a peer id to the whitelist.
    pub fn allow(&mut self, peer_id: &str) {
        self.whitelist.insert(peer_id.to_string());
    }

    /// Removes a peer id from the whitelist and force-closes any live
    /// connection with it: revoking access tears the session down now,
    /// not at the next heartbeat.
    pub fn deny(&mut self, peer_id: &str) {
        self.whitelist.remove(peer_id);
        self.close_peer(peer_id, Instant::now());
    }

    /// Adds a peer id to the blacklist and force-closes any live
    /// connection with it.
    pub fn ban(&mut self, peer_id: &str) {
        self.blacklist.insert(peer_id.to_string());
        self.close_peer(peer_id, Instant::now());
    }

    /// Removes a peer id from the blacklist.
    pub fn unban(&mut self, peer_id: &str) {
        self.blacklist.remove(peer_id);
    }

    /// The list-based part of the admission rule, re-evaluated at
    /// connection-open time (never cached): not blacklisted, and
    /// whitelisted when the whitelist is enabled. Hosting state, the
    /// accept flag, and capacity are checked separately at the same
    /// moment.
    pub fn would_admit(&self, peer_id: &str) -> bool {
        !self.blacklist.contains(peer_id)
            && (!self.use_whitelist || self.whitelist.contains(peer_id))
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Dials a remote peer (client mode).
    ///
    /// Fails on self-connection, before identity assignment, while
    /// hosting, or while any connection exists: client mode is strictly
    /// one connection at a time. A successful dial clears all locally
    /// held synced-object state; a fresh connection implies a fresh sync
    /// session and stale state from a previous host must not leak.
    pub fn connect_to(&mut self, peer_id: &str) -> Result<(), SessionError> {
        let own_id = self.id.as_deref().ok_or(SessionError::NotStarted)?;
        if peer_id == own_id {
            return Err(SessionError::SelfConnection(peer_id.to_string()));
        }
        if self.hosting {
            return Err(SessionError::HostingActive);
        }
        if let Some(existing) = self.connections.keys().next() {
            return Err(SessionError::AlreadyConnected(existing.clone()));
        }

        self.synced.clear();
        lock_queue(&self.changes).clear();

        let conn = self.backend.dial(peer_id);
        let peer = PeerSession::new(
            peer_id.to_string(),
            conn,
            PeerRole::Initiator,
            Instant::now(),
        );
        self.routes.insert(conn, peer_id.to_string());
        self.connections.insert(peer_id.to_string(), peer);
        Ok(())
    }

    /// Best-effort send to one peer; silent no-op if the id is unknown
    /// (disconnection races are expected, not errors).
    pub fn send_to(&mut self, peer_id: &str, data: &str) {
        if let Some(peer) = self.connections.get(peer_id) {
            if peer.is_open() {
                self.backend.send(peer.conn(), data);
            }
        }
    }

    /// Best-effort send to every open peer.
    pub fn send_to_all(&mut self, data: &str) {
        for peer in self.connections.values() {
            if peer.is_open() {
                self.backend.send(peer.conn(), data);
            }
        }
    }

    /// Best-effort send to every open peer except one.
    pub fn send_to_all_except(&mut self, excluded: &str, data: &str) {
        for peer in self.connections.values() {
            if peer.is_open() && peer.peer_id() != excluded {
                self.backend.send(peer.conn(), data);
            }
        }
    }

    /// Triggers the closing path for one peer.
    pub fn close_connection(&mut self, peer_id: &str) {
        self.close_peer(peer_id, Instant::now());
    }

    /// Triggers the closing path for every peer.
    pub fn close_all_connections(&mut self) {
        let now = Instant::now();
        for peer_id in self.peer_ids() {
            self.close_peer(&peer_id, now);
        }
    }

    // ------------------------------------------------------------------
    // Synced objects (authoritative side)
    // ------------------------------------------------------------------

    /// Replicates a value to all connected clients.
    ///
    /// The value is deep-copied through a JSON round trip, so only plain
    /// data enters the synced state. Broadcasts NEWSYNC, stores the
    /// tracker, fires the created event, and returns the fresh uuid.
    pub fn sync_object<T: Serialize>(&mut self, value: &T) -> Result<String, SessionError> {
        self.require_authoritative()?;

        let plain = serde_json::to_value(value)?;
        let serialized = serde_json::to_string(&plain)?;

        let mut uuid = Uuid::new_v4().to_string();
        while self.synced.contains_key(&uuid) {
            uuid = Uuid::new_v4().to_string();
        }

        let tracker = self.make_tracker(&uuid, plain.clone());
        self.synced.insert(uuid.clone(), tracker);
        self.broadcast_sync(
            &SyncMessage::NewSync {
                uuid: uuid.clone(),
                object: serialized,
            },
            None,
        );
        self.emit(SessionEvent::HostSyncedDataCreated {
            uuid: uuid.clone(),
            value: plain,
        });
        Ok(uuid)
    }

    /// Retires a synced object. Unknown uuids are a silent no-op: no
    /// broadcast, no event.
    pub fn unsync(&mut self, uuid: &str) -> Result<(), SessionError> {
        self.require_authoritative()?;

        let Some(tracker) = self.synced.remove(uuid) else {
            return Ok(());
        };
        let value = tracker.snapshot();
        self.broadcast_sync(
            &SyncMessage::UnSync {
                uuid: uuid.to_string(),
            },
            None,
        );
        self.emit(SessionEvent::HostUnsyncedData {
            uuid: uuid.to_string(),
            value,
        });
        Ok(())
    }

    fn require_authoritative(&self) -> Result<(), SessionError> {
        if !self.hosting && !self.connections.is_empty() {
            return Err(SessionError::NotAuthoritative);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn handle_signal(&mut self, event: SignalingEvent, now: Instant) {
        match event {
            SignalingEvent::IdentityOpened { id } => {
                self.id = Some(id.clone());
                self.emit(SessionEvent::IdentityOpened { id });
            }
            SignalingEvent::IdentityUnavailable { id } => {
                self.identity_requested = false;
                self.emit(SessionEvent::IdUnavailable { id });
            }
            SignalingEvent::IdentityInvalid { id } => {
                self.identity_requested = false;
                self.emit(SessionEvent::IdInvalid { id });
            }
            SignalingEvent::PeerClosed => self.emit(SessionEvent::PeerClosed),
            SignalingEvent::PeerDisconnected => self.emit(SessionEvent::PeerDisconnected),
            SignalingEvent::PeerError { message } => self.emit(SessionEvent::PeerError {
                peer_id: None,
                message,
            }),
            SignalingEvent::IncomingConnection { conn, peer_id } => {
                self.handle_incoming(conn, peer_id, now)
            }
            SignalingEvent::ConnectionOpened { conn } => self.handle_opened(conn, now),
            SignalingEvent::ConnectionData { conn, payload } => {
                self.handle_data(conn, &payload, now)
            }
            SignalingEvent::ConnectionClosed { conn } => self.handle_transport_closed(conn),
            SignalingEvent::ConnectionError { conn, message } => {
                let peer_id = self.routes.get(&conn).cloned();
                self.emit(SessionEvent::PeerError {
                    peer_id: peer_id.clone(),
                    message,
                });
                // A failed dial produces no close event; reap the entry
                // here or it would block reconnects (and, on a host,
                // consume capacity) forever.
                if let Some(peer_id) = peer_id {
                    self.close_peer(&peer_id, now);
                }
            }
        }
    }

    /// Inbound connection attempt: the peer enters the table immediately,
    /// before admission resolves, so capacity checks during a burst of
    /// simultaneous attempts see partially-admitted peers.
    fn handle_incoming(&mut self, conn: ConnectionId, peer_id: String, now: Instant) {
        // A second connection under an id we already track supersedes the
        // first, which goes through the regular closing path so its closed
        // event still fires.
        self.close_peer(&peer_id, now);
        let peer = PeerSession::new(peer_id.clone(), conn, PeerRole::Receiver, now);
        self.routes.insert(conn, peer_id.clone());
        self.connections.insert(peer_id.clone(), peer);
        self.emit(SessionEvent::IncomingConnection { peer_id });
    }

    fn handle_opened(&mut self, conn: ConnectionId, now: Instant) {
        let Some(peer_id) = self.routes.get(&conn).cloned() else {
            return;
        };
        let Some(role) = self.connections.get(&peer_id).map(|p| p.role()) else {
            return;
        };

        match role {
            PeerRole::Receiver => {
                let admitted = self.hosting
                    && self.accept_connections
                    && self.connections.len() <= self.max_clients
                    && self.would_admit(&peer_id);
                if !admitted {
                    // Straight to closing; the remote observes only a
                    // clean teardown, never a reason.
                    self.close_peer(&peer_id, now);
                    return;
                }

                if let Some(peer) = self.connections.get_mut(&peer_id) {
                    peer.open(now);
                }
                self.backend.send(conn, protocol::CONFIRM);

                // Late-join snapshot: push every live synced object to
                // this connection only.
                let frames: Vec<String> = self
                    .synced
                    .iter()
                    .filter_map(|(uuid, tracker)| {
                        let object = serde_json::to_string(&tracker.snapshot()).ok()?;
                        SyncMessage::NewSync {
                            uuid: uuid.clone(),
                            object,
                        }
                        .encode()
                    })
                    .collect();
                for frame in frames {
                    self.backend.send(conn, &frame);
                }

                self.emit(SessionEvent::HostPeerOpened { peer_id });
            }
            PeerRole::Initiator => {
                if let Some(peer) = self.connections.get_mut(&peer_id) {
                    peer.open(now);
                }
                self.emit(SessionEvent::ClientPeerOpened { peer_id });
            }
        }
    }

    fn handle_data(&mut self, conn: ConnectionId, payload: &str, now: Instant) {
        let Some(peer_id) = self.routes.get(&conn).cloned() else {
            return;
        };
        let (role, open) = {
            let Some(peer) = self.connections.get_mut(&peer_id) else {
                return;
            };
            peer.mark_activity(now);
            (peer.role(), peer.is_open())
        };

        if !open {
            // Only a close notice means anything before the open state.
            if protocol::classify(payload) == Inbound::Close {
                self.close_peer(&peer_id, now);
            }
            return;
        }

        match protocol::classify(payload) {
            Inbound::KeepAlive => {}
            Inbound::Close => self.close_peer(&peer_id, now),
            Inbound::Confirm => {
                if role == PeerRole::Initiator {
                    self.emit(SessionEvent::ClientConnectionConfirmed { peer_id });
                }
            }
            Inbound::Sync(msg) => self.handle_sync(&peer_id, role, msg),
            Inbound::Application(data) => {
                let data = data.to_string();
                match role {
                    PeerRole::Receiver => {
                        self.emit(SessionEvent::HostReceivedData { peer_id, data })
                    }
                    PeerRole::Initiator => {
                        self.emit(SessionEvent::ClientReceivedData { peer_id, data })
                    }
                }
            }
        }
    }

    fn handle_sync(&mut self, origin: &str, origin_role: PeerRole, msg: SyncMessage) {
        match msg {
            SyncMessage::NewSync { uuid, object } => {
                // Idempotent against duplicate delivery (per-connection
                // push racing a broadcast).
                if self.synced.contains_key(&uuid) {
                    return;
                }
                let Ok(plain) = serde_json::from_str::<Value>(&object) else {
                    return;
                };
                let tracker = self.make_tracker(&uuid, plain.clone());
                self.synced.insert(uuid.clone(), tracker);
                let event = if self.hosting {
                    SessionEvent::HostSyncedDataCreated { uuid, value: plain }
                } else {
                    SessionEvent::ClientSyncedDataCreated { uuid, value: plain }
                };
                self.emit(event);
            }
            SyncMessage::ChangeSync { uuid, path, value } => {
                // Tolerate stale updates racing a local unsync.
                let Some(tracker) = self.synced.get(&uuid) else {
                    return;
                };
                tracker.apply_silent(&path, value.clone());

                if origin_role == PeerRole::Receiver {
                    // We are the relay: every other connection sees the
                    // identical message, the originator gets no echo.
                    self.broadcast_sync(
                        &SyncMessage::ChangeSync {
                            uuid: uuid.clone(),
                            path: path.clone(),
                            value: value.clone(),
                        },
                        Some(origin),
                    );
                    self.emit(SessionEvent::HostSyncedDataChanged { uuid, path, value });
                } else {
                    self.emit(SessionEvent::ClientSyncedDataChanged { uuid, path, value });
                }
            }
            SyncMessage::UnSync { uuid } => {
                let Some(tracker) = self.synced.remove(&uuid) else {
                    return;
                };
                let value = tracker.snapshot();
                let event = if self.hosting {
                    SessionEvent::HostUnsyncedData { uuid, value }
                } else {
                    SessionEvent::ClientUnsyncedData { uuid, value }
                };
                self.emit(event);
            }
        }
    }

    /// The transport itself reported a close (e.g. the remote vanished
    /// without a CLOSE notice). Cleanup tolerates running after the local
    /// closing path already did the work.
    fn handle_transport_closed(&mut self, conn: ConnectionId) {
        self.pending_closes.retain(|pending| pending.conn != conn);
        let Some(peer_id) = self.routes.remove(&conn) else {
            return;
        };
        let Some(peer) = self.connections.remove(&peer_id) else {
            return;
        };
        if peer.is_open() {
            self.emit_closed(peer.role(), peer_id);
        }
    }

    /// The closing path: CLOSE notice, grace-delayed transport close,
    /// table removal. Safe to invoke repeatedly; later calls find no
    /// table entry and do nothing, so closed events fire at most once.
    fn close_peer(&mut self, peer_id: &str, now: Instant) {
        let Some(mut peer) = self.connections.remove(peer_id) else {
            return;
        };
        self.routes.remove(&peer.conn());
        let was_open = peer.is_open();
        peer.begin_closing();

        self.backend.send(peer.conn(), protocol::CLOSE);
        self.pending_closes.push(PendingClose {
            conn: peer.conn(),
            deadline: now + CLOSE_GRACE,
        });

        if was_open {
            self.emit_closed(peer.role(), peer_id.to_string());
        }
    }

    fn emit_closed(&mut self, role: PeerRole, peer_id: String) {
        let event = match role {
            PeerRole::Receiver => SessionEvent::HostPeerClosed { peer_id },
            PeerRole::Initiator => SessionEvent::ClientPeerClosed { peer_id },
        };
        self.emit(event);
    }

    /// Wraps a plain value so that mutations through the returned tracker
    /// are queued for broadcast as CHANGESYNC.
    fn make_tracker(&self, uuid: &str, value: Value) -> TrackedValue {
        let queue = Arc::clone(&self.changes);
        let uuid = uuid.to_string();
        TrackedValue::wrap(value, move |path, value| {
            lock_queue(&queue).push_back(LocalChange {
                uuid: uuid.clone(),
                path: path.to_vec(),
                value: value.clone(),
            });
        })
    }

    /// Broadcasts queued local mutations to every connection. On a host
    /// that is the fan-out to all clients; on a client it reaches only
    /// the host, which relays further.
    fn flush_changes(&mut self) {
        let drained: Vec<LocalChange> = lock_queue(&self.changes).drain(..).collect();
        for change in drained {
            // Changes racing a concurrent unsync are dropped.
            if !self.synced.contains_key(&change.uuid) {
                continue;
            }
            self.broadcast_sync(
                &SyncMessage::ChangeSync {
                    uuid: change.uuid,
                    path: change.path,
                    value: change.value,
                },
                None,
            );
        }
    }

    fn broadcast_sync(&mut self, msg: &SyncMessage, except: Option<&str>) {
        let Some(frame) = msg.encode() else {
            return;
        };
        for peer in self.connections.values() {
            if !peer.is_open() {
                continue;
            }
            if except.is_some_and(|skip| skip == peer.peer_id()) {
                continue;
            }
            self.backend.send(peer.conn(), &frame);
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.dispatcher.dispatch(&event);
    }
}

fn lock_queue(queue: &ChangeQueue) -> std::sync::MutexGuard<'_, VecDeque<LocalChange>> {
    // Queue contents are plain data; poisoning leaves nothing invalid.
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
