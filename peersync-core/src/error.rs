// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Error Types
//!
//! Errors returned for local API misuse. Remote outcomes (identity taken,
//! admission rejection, peer death) are reported through session events,
//! not through this type — they are expected results of a handshake, not
//! caller bugs.

use thiserror::Error;

/// Unified error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session has not completed identity assignment yet.
    #[error("session not started")]
    NotStarted,

    /// `start` was called on a session that already holds an identity.
    #[error("session already started")]
    AlreadyStarted,

    /// Attempted to connect to our own peer id.
    #[error("cannot connect to own id: {0}")]
    SelfConnection(String),

    /// Outbound connects are not allowed while hosting.
    #[error("cannot dial out while hosting")]
    HostingActive,

    /// Client mode holds at most one connection at a time.
    #[error("already connected to {0}")]
    AlreadyConnected(String),

    /// Synced-object operations require authoritative (hosting) mode.
    #[error("synced objects require hosting mode")]
    NotAuthoritative,

    /// The value could not be represented as plain JSON data.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}
