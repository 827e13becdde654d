// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Signaling Backend Trait
//!
//! Platform-agnostic interface to the signaling collaborator. Calls are
//! fire-and-forget; every asynchronous outcome (identity assignment,
//! connection open, inbound data, errors) is reported through the polled
//! event stream. A send on a dead connection is a silent no-op, matching
//! the best-effort contract of the data channel.

/// Opaque handle to one data-channel connection, assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Events surfaced by the signaling collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// The requested identity was assigned; it is fixed from here on.
    IdentityOpened { id: String },
    /// The requested identity is held by another participant.
    IdentityUnavailable { id: String },
    /// The requested identity was rejected as malformed.
    IdentityInvalid { id: String },
    /// The signaling client itself shut down.
    PeerClosed,
    /// The link to the signaling server was lost.
    PeerDisconnected,
    /// A signaling-level error not tied to one connection.
    PeerError { message: String },
    /// A remote peer initiated a connection to us.
    IncomingConnection {
        conn: ConnectionId,
        peer_id: String,
    },
    /// A connection (inbound or dialed) reached the open state.
    ConnectionOpened { conn: ConnectionId },
    /// Data arrived on an open connection.
    ConnectionData { conn: ConnectionId, payload: String },
    /// The transport reported a connection closed.
    ConnectionClosed { conn: ConnectionId },
    /// An error on one connection.
    ConnectionError {
        conn: ConnectionId,
        message: String,
    },
}

/// Interface to the external signaling/data-channel library.
///
/// Implementations deliver events in the order they occurred; the session
/// drains them via [`SignalingBackend::poll`] on its own schedule, so the
/// whole stack stays single-threaded and cooperative.
pub trait SignalingBackend {
    /// Requests assignment of `requested` as our identity. The outcome
    /// arrives as one of the identity events.
    fn request_identity(&mut self, requested: &str);

    /// Initiates a connection to `peer_id`. The returned handle is valid
    /// immediately; the connection itself opens (or fails) asynchronously.
    fn dial(&mut self, peer_id: &str) -> ConnectionId;

    /// Sends a payload on a connection. Silent no-op if the connection is
    /// gone.
    fn send(&mut self, conn: ConnectionId, payload: &str);

    /// Closes a connection. Both sides observe a close event.
    fn close(&mut self, conn: ConnectionId);

    /// Takes the next pending event, if any.
    fn poll(&mut self) -> Option<SignalingEvent>;
}
