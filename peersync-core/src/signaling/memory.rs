// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-Memory Signaling
//!
//! A process-local [`SignalingBackend`] backed by a shared hub. Endpoints
//! claim identities, dial each other by id, and exchange payloads through
//! per-endpoint event queues that are drained by `poll`. Used by the test
//! suite and by multi-session demos running in one process.
//!
//! The hub can also misbehave on request: links can be killed without any
//! close notification (`silence_between`), which is how tests produce the
//! "silently dead peer" the heartbeat exists to detect.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{ConnectionId, SignalingBackend, SignalingEvent};

struct LinkEnd {
    owner: u64,
    remote_conn: u64,
}

#[derive(Default)]
struct HubState {
    next_endpoint: u64,
    next_conn: u64,
    /// Claimed identity -> endpoint.
    ids: HashMap<String, u64>,
    /// Endpoint -> claimed identity.
    endpoint_ids: HashMap<u64, String>,
    /// Endpoint -> pending events.
    queues: HashMap<u64, VecDeque<SignalingEvent>>,
    /// Connection handle -> link end. A live link has two entries.
    links: HashMap<u64, LinkEnd>,
}

impl HubState {
    fn push(&mut self, endpoint: u64, event: SignalingEvent) {
        self.queues.entry(endpoint).or_default().push_back(event);
    }

    /// Removes both ends of a link; returns the local end and, if still
    /// present, the remote end.
    fn unlink(&mut self, conn: u64) -> Option<(LinkEnd, Option<LinkEnd>)> {
        let end = self.links.remove(&conn)?;
        let remote = self.links.remove(&end.remote_conn);
        Some((end, remote))
    }
}

/// Shared broker routing connections between [`MemorySignaling`] endpoints.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new endpoint attached to this hub.
    pub fn endpoint(&self) -> MemorySignaling {
        let mut state = lock(&self.state);
        state.next_endpoint += 1;
        let endpoint = state.next_endpoint;
        state.queues.insert(endpoint, VecDeque::new());
        MemorySignaling {
            state: Arc::clone(&self.state),
            endpoint,
        }
    }

    /// Kills every link between the two identities without delivering any
    /// close event to either side. Simulates silent network death.
    pub fn silence_between(&self, a: &str, b: &str) {
        let mut state = lock(&self.state);
        let (Some(&ea), Some(&eb)) = (state.ids.get(a), state.ids.get(b)) else {
            return;
        };
        let doomed: Vec<u64> = state
            .links
            .iter()
            .filter(|(_, end)| end.owner == ea)
            .filter(|(_, end)| {
                state
                    .links
                    .get(&end.remote_conn)
                    .is_some_and(|remote| remote.owner == eb)
            })
            .map(|(&conn, _)| conn)
            .collect();
        for conn in doomed {
            let _ = state.unlink(conn);
        }
    }

    /// Reports loss of the signaling-server link to one endpoint.
    pub fn drop_signaling(&self, id: &str) {
        let mut state = lock(&self.state);
        if let Some(&endpoint) = state.ids.get(id) {
            state.push(endpoint, SignalingEvent::PeerDisconnected);
        }
    }

    /// Reports a signaling-client shutdown to one endpoint.
    pub fn close_signaling(&self, id: &str) {
        let mut state = lock(&self.state);
        if let Some(&endpoint) = state.ids.get(id) {
            state.push(endpoint, SignalingEvent::PeerClosed);
        }
    }

    /// Reports a signaling-level error to one endpoint.
    pub fn raise_error(&self, id: &str, message: &str) {
        let mut state = lock(&self.state);
        if let Some(&endpoint) = state.ids.get(id) {
            state.push(
                endpoint,
                SignalingEvent::PeerError {
                    message: message.to_string(),
                },
            );
        }
    }
}

/// One endpoint of a [`MemoryHub`].
pub struct MemorySignaling {
    state: Arc<Mutex<HubState>>,
    endpoint: u64,
}

impl SignalingBackend for MemorySignaling {
    fn request_identity(&mut self, requested: &str) {
        let mut state = lock(&self.state);
        let id = requested.to_string();

        if id.is_empty() || id.chars().any(char::is_whitespace) {
            state.push(self.endpoint, SignalingEvent::IdentityInvalid { id });
            return;
        }
        if let Some(&holder) = state.ids.get(&id) {
            if holder != self.endpoint {
                state.push(self.endpoint, SignalingEvent::IdentityUnavailable { id });
                return;
            }
        }

        state.ids.insert(id.clone(), self.endpoint);
        state.endpoint_ids.insert(self.endpoint, id.clone());
        state.push(self.endpoint, SignalingEvent::IdentityOpened { id });
    }

    fn dial(&mut self, peer_id: &str) -> ConnectionId {
        let mut state = lock(&self.state);
        state.next_conn += 1;
        let local = state.next_conn;

        let our_id = state.endpoint_ids.get(&self.endpoint).cloned();
        let target = state.ids.get(peer_id).copied();
        match (our_id, target) {
            (Some(our_id), Some(target)) => {
                state.next_conn += 1;
                let remote = state.next_conn;
                state.links.insert(
                    local,
                    LinkEnd {
                        owner: self.endpoint,
                        remote_conn: remote,
                    },
                );
                state.links.insert(
                    remote,
                    LinkEnd {
                        owner: target,
                        remote_conn: local,
                    },
                );
                state.push(
                    target,
                    SignalingEvent::IncomingConnection {
                        conn: ConnectionId(remote),
                        peer_id: our_id,
                    },
                );
                state.push(
                    target,
                    SignalingEvent::ConnectionOpened {
                        conn: ConnectionId(remote),
                    },
                );
                state.push(
                    self.endpoint,
                    SignalingEvent::ConnectionOpened {
                        conn: ConnectionId(local),
                    },
                );
            }
            (None, _) => {
                state.push(
                    self.endpoint,
                    SignalingEvent::ConnectionError {
                        conn: ConnectionId(local),
                        message: "no identity claimed".to_string(),
                    },
                );
            }
            (_, None) => {
                state.push(
                    self.endpoint,
                    SignalingEvent::ConnectionError {
                        conn: ConnectionId(local),
                        message: format!("unknown peer: {peer_id}"),
                    },
                );
            }
        }

        ConnectionId(local)
    }

    fn send(&mut self, conn: ConnectionId, payload: &str) {
        let mut state = lock(&self.state);
        let Some(end) = state.links.get(&conn.0) else {
            return; // dead link, best-effort send
        };
        let remote_conn = end.remote_conn;
        let Some(remote_owner) = state.links.get(&remote_conn).map(|e| e.owner) else {
            return;
        };
        state.push(
            remote_owner,
            SignalingEvent::ConnectionData {
                conn: ConnectionId(remote_conn),
                payload: payload.to_string(),
            },
        );
    }

    fn close(&mut self, conn: ConnectionId) {
        let mut state = lock(&self.state);
        let Some((end, remote)) = state.unlink(conn.0) else {
            return;
        };
        // Both sides observe the close, like a real transport.
        state.push(self.endpoint, SignalingEvent::ConnectionClosed { conn });
        if let Some(remote_end) = remote {
            state.push(
                remote_end.owner,
                SignalingEvent::ConnectionClosed {
                    conn: ConnectionId(end.remote_conn),
                },
            );
        }
    }

    fn poll(&mut self) -> Option<SignalingEvent> {
        let mut state = lock(&self.state);
        state.queues.get_mut(&self.endpoint)?.pop_front()
    }
}

fn lock(state: &Arc<Mutex<HubState>>) -> MutexGuard<'_, HubState> {
    // Hub state is plain bookkeeping; poisoning leaves nothing invalid.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
