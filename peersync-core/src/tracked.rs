// SPDX-FileCopyrightText: 2026 Peersync Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Change-Tracking Value
//!
//! Wraps a plain JSON value so that every mutation reports the full key
//! path from the root together with the new value. This is the observer
//! side of the object-sync protocol: the session wires the change callback
//! to its outbound CHANGESYNC queue.
//!
//! There is no reflective proxying here: nested access is expressed with
//! cursors that carry an explicit path prefix. All handles cloned from one
//! `TrackedValue` alias the same underlying root, so "re-wrapping" a value
//! can never produce a second, diverging tracker.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

/// Callback invoked after a tracked write with the key path and new value.
pub type ChangeCallback = Box<dyn Fn(&[String], &Value) + Send + Sync>;

struct TrackedInner {
    root: Mutex<Value>,
    on_change: ChangeCallback,
}

/// A mutation-tracked JSON value.
///
/// Cloning is cheap and yields another handle to the same root value.
/// Cursors ([`TrackedCursor`]) address nested positions; writes through
/// either surface fire the change callback with the path from the root.
///
/// Values are plain `serde_json` trees, which are acyclic by construction,
/// so the unbounded-recursion hazard of tracking cyclic graphs cannot
/// arise.
#[derive(Clone)]
pub struct TrackedValue {
    inner: Arc<TrackedInner>,
}

impl TrackedValue {
    /// Wraps a plain value, attaching the change callback.
    pub fn wrap<F>(value: Value, on_change: F) -> Self
    where
        F: Fn(&[String], &Value) + Send + Sync + 'static,
    {
        TrackedValue {
            inner: Arc::new(TrackedInner {
                root: Mutex::new(value),
                on_change: Box::new(on_change),
            }),
        }
    }

    /// Returns the cursor addressing the root of the tree.
    pub fn cursor(&self) -> TrackedCursor {
        TrackedCursor {
            inner: Arc::clone(&self.inner),
            path: Vec::new(),
        }
    }

    /// Clones the current plain value out of the tracker.
    ///
    /// This is the reverse of [`TrackedValue::wrap`]: the result is
    /// deep-equal to the wrapped value including every mutation applied
    /// through the tracker so far.
    pub fn snapshot(&self) -> Value {
        self.lock_root().clone()
    }

    /// Reads the value at `path`, or `None` if the path does not resolve.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let root = self.lock_root();
        let mut cur: &Value = &root;
        for key in path {
            cur = step(cur, key.as_ref())?;
        }
        Some(cur.clone())
    }

    /// Writes `value` at `path` and fires the change callback.
    ///
    /// Returns false (and fires nothing) if an intermediate path step does
    /// not resolve. The final key may be new on an object; array indices
    /// must be in bounds.
    pub fn set<S: AsRef<str>>(&self, path: &[S], value: Value) -> bool {
        let path: Vec<String> = path.iter().map(|k| k.as_ref().to_string()).collect();
        self.write(&path, value, true)
    }

    /// Writes `value` at `path` without firing the change callback.
    ///
    /// Used when applying a remote mutation: the write must land in the
    /// plain structure but must not be reported as a fresh local change.
    pub fn apply_silent(&self, path: &[String], value: Value) -> bool {
        self.write(path, value, false)
    }

    fn write(&self, path: &[String], value: Value, notify: bool) -> bool {
        let written = {
            let mut root = self.lock_root();
            write_at(&mut root, path, &value)
        };
        // Callback runs outside the root lock; handlers may read snapshots.
        if written && notify {
            (self.inner.on_change)(path, &value);
        }
        written
    }

    /// True if both handles track the same underlying value.
    pub fn same_tracker(&self, other: &TrackedValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock_root(&self) -> MutexGuard<'_, Value> {
        // Values are plain data; a poisoned lock leaves nothing invalid.
        self.inner
            .root
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for TrackedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedValue")
            .field("value", &self.snapshot())
            .finish()
    }
}

/// A position inside a tracked tree.
///
/// `enter` is the analogue of reading a nested object property and getting
/// a nested proxy back: the child cursor extends the path prefix and aliases
/// the same root.
#[derive(Clone)]
pub struct TrackedCursor {
    inner: Arc<TrackedInner>,
    path: Vec<String>,
}

impl TrackedCursor {
    /// Returns a child cursor addressing `key` under this position.
    pub fn enter(&self, key: &str) -> TrackedCursor {
        let mut path = self.path.clone();
        path.push(key.to_string());
        TrackedCursor {
            inner: Arc::clone(&self.inner),
            path,
        }
    }

    /// The key path from the root to this cursor.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Reads the value at this position.
    pub fn get(&self) -> Option<Value> {
        self.handle().get(&self.path)
    }

    /// Writes `value` at `key` under this position and fires the change
    /// callback with the full path from the root.
    pub fn assign(&self, key: &str, value: Value) -> bool {
        let mut path = self.path.clone();
        path.push(key.to_string());
        self.handle().write(&path, value, true)
    }

    fn handle(&self) -> TrackedValue {
        TrackedValue {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for TrackedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedCursor")
            .field("path", &self.path)
            .finish()
    }
}

fn step<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Descends `path` applying every key but the last, then assigns at the
/// final key. Returns false if an intermediate step is unresolvable or the
/// final container cannot take the key.
fn write_at(root: &mut Value, path: &[String], value: &Value) -> bool {
    let Some((last, prefix)) = path.split_last() else {
        *root = value.clone();
        return true;
    };

    let mut cur = root;
    for key in prefix {
        match step_mut(cur, key) {
            Some(next) => cur = next,
            None => return false,
        }
    }

    match cur {
        Value::Object(map) => {
            map.insert(last.clone(), value.clone());
            true
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = value.clone();
                true
            }
            _ => false,
        },
        _ => false,
    }
}
