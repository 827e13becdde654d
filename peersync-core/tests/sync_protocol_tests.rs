//! Object-sync protocol tests: replication, fan-out, late join, retirement.

mod common;

use serde_json::json;

use common::{host, record, settle, started};
use peersync_core::{EventKind, MemoryHub, MemorySignaling, Session, SessionEvent, SyncMessage};

struct SyncedNet {
    h: Session<MemorySignaling>,
    a: Session<MemorySignaling>,
    b: Session<MemorySignaling>,
}

fn two_client_net() -> SyncedNet {
    let hub = MemoryHub::new();
    let mut h = host(&hub, "host");
    let mut a = started(&hub, "alice");
    let mut b = started(&hub, "bob");

    a.connect_to("host").unwrap();
    b.connect_to("host").unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);
    assert_eq!(h.connection_count(), 2);

    SyncedNet { h, a, b }
}

fn changed_payload(event: &SessionEvent) -> Option<(String, Vec<String>, serde_json::Value)> {
    match event {
        SessionEvent::HostSyncedDataChanged { uuid, path, value }
        | SessionEvent::ClientSyncedDataChanged { uuid, path, value } => {
            Some((uuid.clone(), path.clone(), value.clone()))
        }
        _ => None,
    }
}

#[test]
fn sync_object_replicates_to_all_clients() {
    let SyncedNet {
        mut h,
        mut a,
        mut b,
        ..
    } = two_client_net();

    let h_created = record(&mut h, &[EventKind::HostSyncedDataCreated]);
    let a_created = record(&mut a, &[EventKind::ClientSyncedDataCreated]);
    let b_created = record(&mut b, &[EventKind::ClientSyncedDataCreated]);

    let value = json!({"toto": {"lolo": 2}});
    let uuid = h.sync_object(&value).unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);

    assert_eq!(h_created.count(EventKind::HostSyncedDataCreated), 1);
    assert_eq!(a_created.count(EventKind::ClientSyncedDataCreated), 1);
    assert_eq!(b_created.count(EventKind::ClientSyncedDataCreated), 1);

    for session in [&h, &a, &b] {
        let tracker = session.synced(&uuid).expect("tracked on every session");
        assert_eq!(tracker.snapshot(), value);
    }
}

#[test]
fn client_edit_fans_out_through_the_host_without_echo() {
    let SyncedNet {
        mut h,
        mut a,
        mut b,
        ..
    } = two_client_net();

    let uuid = h.sync_object(&json!({"toto": {"lolo": 2}})).unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);

    let h_changed = record(&mut h, &[EventKind::HostSyncedDataChanged]);
    let a_changed = record(&mut a, &[EventKind::ClientSyncedDataChanged]);
    let b_changed = record(&mut b, &[EventKind::ClientSyncedDataChanged]);

    let tracker = a.synced(&uuid).unwrap();
    assert!(tracker.set(&["toto", "lolo"], json!(3)));
    settle(&mut [&mut a, &mut h, &mut b]);

    // Host and the other client observe the change...
    assert_eq!(h_changed.count(EventKind::HostSyncedDataChanged), 1);
    assert_eq!(b_changed.count(EventKind::ClientSyncedDataChanged), 1);
    let expected = (
        uuid.clone(),
        vec!["toto".to_string(), "lolo".to_string()],
        json!(3),
    );
    assert_eq!(
        h_changed.events().iter().find_map(changed_payload),
        Some(expected.clone())
    );
    assert_eq!(
        b_changed.events().iter().find_map(changed_payload),
        Some(expected)
    );

    // ...while the originator gets no echo.
    assert_eq!(a_changed.count(EventKind::ClientSyncedDataChanged), 0);

    for session in [&h, &a, &b] {
        assert_eq!(
            session.synced(&uuid).unwrap().snapshot(),
            json!({"toto": {"lolo": 3}})
        );
    }
}

#[test]
fn host_edit_reaches_every_client() {
    let SyncedNet {
        mut h,
        mut a,
        mut b,
        ..
    } = two_client_net();

    let uuid = h.sync_object(&json!({"count": 0})).unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);

    let a_changed = record(&mut a, &[EventKind::ClientSyncedDataChanged]);
    let b_changed = record(&mut b, &[EventKind::ClientSyncedDataChanged]);

    assert!(h.synced(&uuid).unwrap().set(&["count"], json!(7)));
    settle(&mut [&mut h, &mut a, &mut b]);

    assert_eq!(a_changed.count(EventKind::ClientSyncedDataChanged), 1);
    assert_eq!(b_changed.count(EventKind::ClientSyncedDataChanged), 1);
    assert_eq!(a.synced(&uuid).unwrap().get(&["count"]), Some(json!(7)));
    assert_eq!(b.synced(&uuid).unwrap().get(&["count"]), Some(json!(7)));
}

#[test]
fn late_joiner_receives_exactly_the_current_snapshot() {
    let hub = MemoryHub::new();
    let mut h = host(&hub, "host");
    let mut a = started(&hub, "alice");
    a.connect_to("host").unwrap();
    settle(&mut [&mut h, &mut a]);

    let a_created = record(&mut a, &[EventKind::ClientSyncedDataCreated]);

    h.sync_object(&json!({"first": 1})).unwrap();
    h.sync_object(&json!({"second": 2})).unwrap();
    settle(&mut [&mut h, &mut a]);
    assert_eq!(a_created.count(EventKind::ClientSyncedDataCreated), 2);

    // The late joiner gets both objects, addressed to it alone.
    let mut c = started(&hub, "carol");
    let c_created = record(&mut c, &[EventKind::ClientSyncedDataCreated]);
    c.connect_to("host").unwrap();
    settle(&mut [&mut h, &mut a, &mut c]);

    assert_eq!(c_created.count(EventKind::ClientSyncedDataCreated), 2);
    assert_eq!(c.synced_uuids().len(), 2);

    // No re-broadcast to peers that already hold the objects.
    assert_eq!(a_created.count(EventKind::ClientSyncedDataCreated), 2);
}

#[test]
fn duplicate_newsync_is_idempotent() {
    let SyncedNet {
        mut h, mut a, ..
    } = two_client_net();

    let uuid = h.sync_object(&json!({"x": 1})).unwrap();
    settle(&mut [&mut h, &mut a]);

    let a_created = record(&mut a, &[EventKind::ClientSyncedDataCreated]);

    let frame = SyncMessage::NewSync {
        uuid: uuid.clone(),
        object: "{\"x\":99}".to_string(),
    }
    .encode()
    .unwrap();
    h.send_to("alice", &frame);
    a.pump();

    assert_eq!(a_created.count(EventKind::ClientSyncedDataCreated), 0);
    // The original object is untouched.
    assert_eq!(a.synced(&uuid).unwrap().snapshot(), json!({"x": 1}));
}

#[test]
fn stale_changesync_and_unsync_are_silent_no_ops() {
    let SyncedNet {
        mut h, mut a, ..
    } = two_client_net();

    let a_events = record(
        &mut a,
        &[
            EventKind::ClientSyncedDataChanged,
            EventKind::ClientUnsyncedData,
        ],
    );

    let change = SyncMessage::ChangeSync {
        uuid: "ghost".to_string(),
        path: vec!["a".to_string()],
        value: json!(1),
    }
    .encode()
    .unwrap();
    let retire = SyncMessage::UnSync {
        uuid: "ghost".to_string(),
    }
    .encode()
    .unwrap();
    h.send_to("alice", &change);
    h.send_to("alice", &retire);
    a.pump();

    assert!(a_events.events().is_empty());
}

#[test]
fn unsync_retires_everywhere_and_unknown_uuid_is_a_no_op() {
    let SyncedNet {
        mut h,
        mut a,
        mut b,
        ..
    } = two_client_net();

    let uuid = h.sync_object(&json!({"state": "live"})).unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);

    let h_unsynced = record(&mut h, &[EventKind::HostUnsyncedData]);
    let a_unsynced = record(&mut a, &[EventKind::ClientUnsyncedData]);

    // Unknown uuid: nothing broadcast, nothing fired.
    h.unsync("no-such-object").unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);
    assert_eq!(h_unsynced.count(EventKind::HostUnsyncedData), 0);
    assert_eq!(a_unsynced.count(EventKind::ClientUnsyncedData), 0);

    h.unsync(&uuid).unwrap();
    settle(&mut [&mut h, &mut a, &mut b]);

    assert_eq!(h_unsynced.count(EventKind::HostUnsyncedData), 1);
    assert_eq!(a_unsynced.count(EventKind::ClientUnsyncedData), 1);
    assert!(h.synced(&uuid).is_none());
    assert!(a.synced(&uuid).is_none());
    assert!(matches!(
        h_unsynced.events().first(),
        Some(SessionEvent::HostUnsyncedData { value, .. }) if *value == json!({"state": "live"})
    ));
}

#[test]
fn sync_object_requires_authority() {
    let SyncedNet { mut a, .. } = two_client_net();

    // A connected client is not authoritative.
    assert!(a.sync_object(&json!({"nope": true})).is_err());
    assert!(a.unsync("anything").is_err());

    // An idle, unconnected session may stage objects before hosting.
    let hub = MemoryHub::new();
    let mut idle = started(&hub, "idle");
    assert!(idle.sync_object(&json!({"ok": true})).is_ok());
}

#[test]
fn non_json_representable_values_are_rejected() {
    let hub = MemoryHub::new();
    let mut h = host(&hub, "host");

    let mut bad = std::collections::HashMap::new();
    bad.insert((1u8, 2u8), "tuple keys cannot become JSON");
    assert!(h.sync_object(&bad).is_err());
}

#[test]
fn connecting_clears_stale_synced_state() {
    let hub = MemoryHub::new();
    let mut h1 = host(&hub, "first-host");
    let mut a = started(&hub, "alice");
    a.connect_to("first-host").unwrap();
    settle(&mut [&mut h1, &mut a]);

    h1.sync_object(&json!({"from": "first"})).unwrap();
    settle(&mut [&mut h1, &mut a]);
    assert_eq!(a.synced_uuids().len(), 1);

    a.close_connection("first-host");
    settle(&mut [&mut h1, &mut a]);

    let mut h2 = host(&hub, "second-host");
    a.connect_to("second-host").unwrap();
    // Stale state from the previous host must not leak into the new
    // sync session.
    assert!(a.synced_uuids().is_empty());
    settle(&mut [&mut h2, &mut a]);
}

#[test]
fn application_payloads_are_delivered_verbatim() {
    let SyncedNet {
        mut h, mut a, ..
    } = two_client_net();

    let h_data = record(&mut h, &[EventKind::HostReceivedData]);
    let a_data = record(&mut a, &[EventKind::ClientReceivedData]);

    h.send_to("alice", "hello there");
    a.send_to("host", r#"{"evt":"chat","text":"hi"}"#);
    settle(&mut [&mut h, &mut a]);

    assert_eq!(
        a_data.events(),
        vec![SessionEvent::ClientReceivedData {
            peer_id: "host".to_string(),
            data: "hello there".to_string(),
        }]
    );
    assert_eq!(
        h_data.events(),
        vec![SessionEvent::HostReceivedData {
            peer_id: "alice".to_string(),
            data: r#"{"evt":"chat","text":"hi"}"#.to_string(),
        }]
    );
}
