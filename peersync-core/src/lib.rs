// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peersync Core Library
//!
//! A peer-to-peer session layer over an external signaling/data-channel
//! collaborator: connection lifecycle with host-side admission control
//! (whitelist, blacklist, capacity), an application-level heartbeat that
//! detects silently dead peers, and a host-authoritative object-sync
//! protocol replicating JSON values across a star topology with
//! path-addressed mutation broadcasts.
//!
//! The signaling/transport layer is not implemented here; anything
//! exposing `connect`/`send`/`close` and lifecycle events can back a
//! session by implementing [`SignalingBackend`]. An in-process
//! [`MemoryHub`] backend is provided for tests and multi-session demos.
//!
//! # Example
//!
//! ```
//! use peersync_core::{EventKind, MemoryHub, Session};
//!
//! let hub = MemoryHub::new();
//!
//! let mut host = Session::new(hub.endpoint());
//! host.start("host").unwrap();
//! host.pump();
//! host.enable_hosting(false);
//!
//! let mut client = Session::new(hub.endpoint());
//! client.start("client").unwrap();
//! client.pump();
//! client.connect_to("host").unwrap();
//!
//! host.pump();
//! client.pump();
//! assert_eq!(host.peer_ids(), vec!["client".to_string()]);
//! ```

pub mod error;
pub mod events;
pub mod peer;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod timer;
pub mod tracked;

pub use error::SessionError;
pub use events::{EventDispatcher, EventKind, SessionEvent};
pub use peer::{PeerRole, PeerState, CLOSE_GRACE, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT};
pub use protocol::{SyncMessage, CLOSE, CONFIRM, IAMHERE};
pub use session::{Session, SessionConfig};
pub use signaling::{ConnectionId, MemoryHub, MemorySignaling, SignalingBackend, SignalingEvent};
pub use tracked::{TrackedCursor, TrackedValue};
