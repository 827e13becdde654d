// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peer Session
//!
//! Per-remote-peer state: one transport connection, a role, and the
//! liveness clocks for the application-level heartbeat. Transitions are
//! executed by the owning session, which is the only place with access to
//! the backend and the event dispatcher.
//!
//! The transport's own open/close events are necessary but not sufficient
//! for liveness: a peer that dies silently produces no transport event at
//! all. The heartbeat contract is therefore part of the protocol: a peer
//! is declared dead after no inbound traffic for [`HEARTBEAT_TIMEOUT`],
//! checked on every tick, and each side emits IAMHERE at
//! [`HEARTBEAT_INTERVAL`] to keep the other side's clock fresh.

use std::time::{Duration, Instant};

use crate::signaling::ConnectionId;
use crate::timer::Timer;

/// Cadence at which IAMHERE keep-alives are emitted per open peer.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Inbound silence after which a peer is declared dead (6x the interval).
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(6);

/// Delay between sending CLOSE and closing the transport connection, so
/// the notice has a chance to flush.
pub const CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Which side initiated this connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// The remote dialed us; subject to admission control.
    Receiver,
    /// We dialed the remote; no admission check on our side.
    Initiator,
}

/// Lifecycle state of a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Waiting for the transport to open.
    Connecting,
    /// Admitted (receiver) or confirmed dialable (initiator); heartbeat
    /// running.
    Open,
    /// Teardown in progress; terminal.
    Closing,
}

/// State for one remote peer.
#[derive(Debug)]
pub struct PeerSession {
    peer_id: String,
    conn: ConnectionId,
    role: PeerRole,
    state: PeerState,
    last_activity: Timer,
    last_heartbeat: Timer,
}

impl PeerSession {
    pub fn new(peer_id: String, conn: ConnectionId, role: PeerRole, now: Instant) -> Self {
        PeerSession {
            peer_id,
            conn,
            role,
            state: PeerState::Connecting,
            last_activity: Timer::start_at(now),
            last_heartbeat: Timer::start_at(now),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PeerState::Open
    }

    /// Marks the transition into the open state, restarting both clocks.
    pub fn open(&mut self, now: Instant) {
        self.state = PeerState::Open;
        self.last_activity.reset_at(now);
        self.last_heartbeat.reset_at(now);
    }

    /// Marks the terminal state.
    pub fn begin_closing(&mut self) {
        self.state = PeerState::Closing;
    }

    /// Any inbound message resets the liveness clock, before
    /// classification.
    pub fn mark_activity(&mut self, now: Instant) {
        self.last_activity.reset_at(now);
    }

    /// True if inbound silence has crossed the death threshold.
    pub fn stale_at(&self, now: Instant) -> bool {
        self.last_activity.exceeds_at(now, HEARTBEAT_TIMEOUT)
    }

    /// True if an IAMHERE is due; resets the emission clock when it is.
    pub fn take_heartbeat_due(&mut self, now: Instant) -> bool {
        if self.last_heartbeat.exceeds_at(now, HEARTBEAT_INTERVAL) {
            self.last_heartbeat.reset_at(now);
            true
        } else {
            false
        }
    }
}
