//! Event System
//!
//! Typed session events and the per-kind callback registry.
//!
//! Every observable outcome of the session surfaces as a [`SessionEvent`].
//! Consumers register handlers per [`EventKind`]; all handlers for a kind
//! run on every occurrence, in registration order. Handlers receive events
//! by reference and never get mutable access to session tables — synced
//! objects are fetched from the session by uuid when a handler wants the
//! live tracker.

use std::collections::HashMap;

use serde_json::Value;

/// Discriminant for every event the session can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Identity assignment succeeded.
    IdentityOpened,
    /// The requested id is already taken.
    IdUnavailable,
    /// The requested id is malformed.
    IdInvalid,
    /// A remote peer initiated a connection to us.
    IncomingConnection,
    /// The signaling client itself shut down.
    PeerClosed,
    /// The signaling server link was lost.
    PeerDisconnected,
    /// A signaling or connection level error.
    PeerError,
    /// Host side: an inbound peer passed admission.
    HostPeerOpened,
    /// Host side: an admitted peer went away.
    HostPeerClosed,
    /// Host side: application payload received.
    HostReceivedData,
    /// Host side: a synced object was created.
    HostSyncedDataCreated,
    /// Host side: a synced-object field changed.
    HostSyncedDataChanged,
    /// Host side: a synced object was retired.
    HostUnsyncedData,
    /// Client side: our outbound connection opened.
    ClientPeerOpened,
    /// Client side: the connection to the host went away.
    ClientPeerClosed,
    /// Client side: application payload received.
    ClientReceivedData,
    /// Client side: the host accepted us (CONFIRM received).
    ClientConnectionConfirmed,
    /// Client side: a synced object arrived from the host.
    ClientSyncedDataCreated,
    /// Client side: a synced-object field changed.
    ClientSyncedDataChanged,
    /// Client side: a synced object was retired by the host.
    ClientUnsyncedData,
}

/// Events emitted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Identity assignment succeeded; the session id is now fixed.
    IdentityOpened { id: String },
    /// The requested id is held by another participant.
    IdUnavailable { id: String },
    /// The requested id was rejected as malformed.
    IdInvalid { id: String },
    /// A remote peer dialed us; admission has not resolved yet.
    IncomingConnection { peer_id: String },
    /// The signaling client shut down.
    PeerClosed,
    /// The signaling server link was lost.
    PeerDisconnected,
    /// An error reported by the signaling layer or a connection.
    PeerError {
        /// The connection's peer id, when the error is per-connection.
        peer_id: Option<String>,
        message: String,
    },
    /// An inbound peer passed admission and is now open.
    HostPeerOpened { peer_id: String },
    /// An admitted peer closed, timed out, or vanished.
    HostPeerClosed { peer_id: String },
    /// Application payload from an admitted peer, delivered verbatim.
    HostReceivedData { peer_id: String, data: String },
    /// A synced object was created on this host.
    HostSyncedDataCreated { uuid: String, value: Value },
    /// A synced-object field changed (locally relayed or from a client).
    HostSyncedDataChanged {
        uuid: String,
        path: Vec<String>,
        value: Value,
    },
    /// A synced object was retired; carries the final plain value.
    HostUnsyncedData { uuid: String, value: Value },
    /// Our outbound connection reached the open state.
    ClientPeerOpened { peer_id: String },
    /// The connection to the host closed, timed out, or vanished.
    ClientPeerClosed { peer_id: String },
    /// Application payload from the host, delivered verbatim.
    ClientReceivedData { peer_id: String, data: String },
    /// The host admitted us.
    ClientConnectionConfirmed { peer_id: String },
    /// A synced object arrived from the host.
    ClientSyncedDataCreated { uuid: String, value: Value },
    /// A synced-object field changed on the host side.
    ClientSyncedDataChanged {
        uuid: String,
        path: Vec<String>,
        value: Value,
    },
    /// The host retired a synced object; carries the final plain value.
    ClientUnsyncedData { uuid: String, value: Value },
}

impl SessionEvent {
    /// The discriminant this event dispatches under.
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::IdentityOpened { .. } => EventKind::IdentityOpened,
            SessionEvent::IdUnavailable { .. } => EventKind::IdUnavailable,
            SessionEvent::IdInvalid { .. } => EventKind::IdInvalid,
            SessionEvent::IncomingConnection { .. } => EventKind::IncomingConnection,
            SessionEvent::PeerClosed => EventKind::PeerClosed,
            SessionEvent::PeerDisconnected => EventKind::PeerDisconnected,
            SessionEvent::PeerError { .. } => EventKind::PeerError,
            SessionEvent::HostPeerOpened { .. } => EventKind::HostPeerOpened,
            SessionEvent::HostPeerClosed { .. } => EventKind::HostPeerClosed,
            SessionEvent::HostReceivedData { .. } => EventKind::HostReceivedData,
            SessionEvent::HostSyncedDataCreated { .. } => EventKind::HostSyncedDataCreated,
            SessionEvent::HostSyncedDataChanged { .. } => EventKind::HostSyncedDataChanged,
            SessionEvent::HostUnsyncedData { .. } => EventKind::HostUnsyncedData,
            SessionEvent::ClientPeerOpened { .. } => EventKind::ClientPeerOpened,
            SessionEvent::ClientPeerClosed { .. } => EventKind::ClientPeerClosed,
            SessionEvent::ClientReceivedData { .. } => EventKind::ClientReceivedData,
            SessionEvent::ClientConnectionConfirmed { .. } => EventKind::ClientConnectionConfirmed,
            SessionEvent::ClientSyncedDataCreated { .. } => EventKind::ClientSyncedDataCreated,
            SessionEvent::ClientSyncedDataChanged { .. } => EventKind::ClientSyncedDataChanged,
            SessionEvent::ClientUnsyncedData { .. } => EventKind::ClientUnsyncedData,
        }
    }
}

/// Handler signature for session events.
pub type EventHandler = Box<dyn Fn(&SessionEvent) + Send>;

/// Per-kind callback registry.
///
/// Handlers are invoked sequentially in registration order, one event at a
/// time; there is no concurrent delivery within one occurrence.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<EventKind, Vec<EventHandler>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: HashMap::new(),
        }
    }

    /// Appends a handler for the given event kind.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&SessionEvent) + Send + 'static,
    {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Dispatches an event to every handler of its kind, in order.
    pub fn dispatch(&self, event: &SessionEvent) {
        if let Some(handlers) = self.handlers.get(&event.kind()) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}
