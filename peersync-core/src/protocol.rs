// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Protocol
//!
//! Messages exchanged over the data channel. Control messages are literal
//! string sentinels; sync-protocol messages are JSON records discriminated
//! by an `evt` field. Anything that matches neither is application payload
//! and is delivered verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heartbeat keep-alive, no payload.
pub const IAMHERE: &str = "Network$IAMHERE";

/// Graceful close notice.
pub const CLOSE: &str = "Network$CLOSE";

/// Admission accepted (host to client).
pub const CONFIRM: &str = "Network$CONFIRM";

/// Sync-protocol messages, `evt`-tagged on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "evt")]
pub enum SyncMessage {
    /// Introduce a synced object. `object` is the serialized plain value.
    #[serde(rename = "Network$NEWSYNC")]
    NewSync { uuid: String, object: String },

    /// Propagate one field mutation at `path`.
    #[serde(rename = "Network$CHANGESYNC")]
    ChangeSync {
        uuid: String,
        path: Vec<String>,
        value: Value,
    },

    /// Retire a synced object.
    #[serde(rename = "Network$UNSYNC")]
    UnSync { uuid: String },
}

impl SyncMessage {
    /// Serializes for the wire.
    ///
    /// These records always serialize; `None` is only possible if a synced
    /// value smuggles in a non-string-keyed map, which `serde_json::Value`
    /// cannot represent.
    pub fn encode(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// Result of classifying one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<'a> {
    /// Heartbeat keep-alive, consumed silently.
    KeepAlive,
    /// Remote announced a graceful close.
    Close,
    /// Host accepted our connection.
    Confirm,
    /// A sync-protocol message.
    Sync(SyncMessage),
    /// Application-defined payload, delivered verbatim.
    Application(&'a str),
}

/// Classifies an inbound payload: control sentinel, then sync message,
/// then application data.
///
/// A payload that merely resembles a sync frame but fails to parse is
/// treated as application data rather than an error.
pub fn classify(payload: &str) -> Inbound<'_> {
    match payload {
        IAMHERE => return Inbound::KeepAlive,
        CLOSE => return Inbound::Close,
        CONFIRM => return Inbound::Confirm,
        _ => {}
    }

    if payload.starts_with('{') {
        if let Ok(msg) = serde_json::from_str::<SyncMessage>(payload) {
            return Inbound::Sync(msg);
        }
    }

    Inbound::Application(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinels_classify_as_control() {
        assert_eq!(classify(IAMHERE), Inbound::KeepAlive);
        assert_eq!(classify(CLOSE), Inbound::Close);
        assert_eq!(classify(CONFIRM), Inbound::Confirm);
    }

    #[test]
    fn newsync_wire_shape() {
        let msg = SyncMessage::NewSync {
            uuid: "u-1".into(),
            object: "{\"a\":1}".into(),
        };
        let wire = msg.encode().unwrap();
        let parsed: Value = serde_json::from_str(&wire).unwrap();

        assert_eq!(parsed["evt"], "Network$NEWSYNC");
        assert_eq!(parsed["uuid"], "u-1");
        assert_eq!(parsed["object"], "{\"a\":1}");
        assert_eq!(classify(&wire), Inbound::Sync(msg));
    }

    #[test]
    fn changesync_wire_shape() {
        let msg = SyncMessage::ChangeSync {
            uuid: "u-2".into(),
            path: vec!["toto".into(), "lolo".into()],
            value: json!(3),
        };
        let wire = msg.encode().unwrap();
        let parsed: Value = serde_json::from_str(&wire).unwrap();

        assert_eq!(parsed["evt"], "Network$CHANGESYNC");
        assert_eq!(parsed["path"], json!(["toto", "lolo"]));
        assert_eq!(parsed["value"], json!(3));
        assert_eq!(classify(&wire), Inbound::Sync(msg));
    }

    #[test]
    fn unsync_wire_shape() {
        let msg = SyncMessage::UnSync { uuid: "u-3".into() };
        let wire = msg.encode().unwrap();
        let parsed: Value = serde_json::from_str(&wire).unwrap();

        assert_eq!(parsed["evt"], "Network$UNSYNC");
        assert_eq!(classify(&wire), Inbound::Sync(msg));
    }

    #[test]
    fn unknown_json_falls_through_to_application() {
        let payload = r#"{"evt":"chat","text":"hello"}"#;
        assert_eq!(classify(payload), Inbound::Application(payload));
    }

    #[test]
    fn malformed_sync_frame_is_application_data() {
        // Right discriminator, wrong fields: delivered verbatim.
        let payload = r#"{"evt":"Network$NEWSYNC","nope":true}"#;
        assert_eq!(classify(payload), Inbound::Application(payload));
    }

    #[test]
    fn plain_text_is_application_data() {
        assert_eq!(classify("hello"), Inbound::Application("hello"));
    }
}
