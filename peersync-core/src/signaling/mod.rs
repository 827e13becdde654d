//! Signaling Layer
//!
//! Abstraction over the external signaling/data-channel collaborator, plus
//! an in-process implementation used by tests and demos.
//!
//! The session layer never talks to a socket itself: identity assignment,
//! connection setup, and data delivery are owned by whatever implements
//! [`SignalingBackend`]. Outcomes arrive as polled [`SignalingEvent`]s.

mod backend;
mod memory;

pub use backend::{ConnectionId, SignalingBackend, SignalingEvent};
pub use memory::{MemoryHub, MemorySignaling};
