//! Shared test helpers: event recording and multi-session plumbing.

#![allow(dead_code)]

pub mod strategies;

use std::sync::{Arc, Mutex};

use peersync_core::{EventKind, MemoryHub, MemorySignaling, Session, SessionEvent};

/// Records every event it is registered for; clones are views onto the
/// same log.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler closure feeding this recorder.
    pub fn handler(&self) -> impl Fn(&SessionEvent) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |event| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Registers one recorder for several event kinds on a session.
pub fn record(
    session: &mut Session<MemorySignaling>,
    kinds: &[EventKind],
) -> EventRecorder {
    let recorder = EventRecorder::new();
    for &kind in kinds {
        session.on(kind, recorder.handler());
    }
    recorder
}

/// Creates a session on the hub with an assigned identity.
pub fn started(hub: &MemoryHub, id: &str) -> Session<MemorySignaling> {
    let mut session = Session::new(hub.endpoint());
    session.start(id).unwrap();
    session.pump();
    assert_eq!(session.id(), Some(id), "identity assignment failed");
    session
}

/// Creates a hosting session on the hub.
pub fn host(hub: &MemoryHub, id: &str) -> Session<MemorySignaling> {
    let mut session = started(hub, id);
    assert!(session.enable_hosting(false));
    session
}

/// Pumps every session until no more events are in flight.
pub fn settle(sessions: &mut [&mut Session<MemorySignaling>]) {
    loop {
        let processed: usize = sessions.iter_mut().map(|s| s.pump()).sum();
        if processed == 0 {
            break;
        }
    }
}
