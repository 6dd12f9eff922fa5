//! Watch events and per-path debouncing
//!
//! The raw event source lives in the binary; this module only defines what an
//! event means to the engine and how bursts of them are coalesced.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use readme_fs::NormalizedPath;
use serde::Serialize;

use crate::clock::Clock;
use crate::sync::FileOutcome;

/// Which half of the mirror a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Modified,
    Created,
    Deleted,
    Moved { to: NormalizedPath },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: NormalizedPath,
    pub kind: EventKind,
    pub side: Side,
}

impl WatchEvent {
    pub fn new(path: impl Into<NormalizedPath>, kind: EventKind, side: Side) -> Self {
        Self {
            path: path.into(),
            kind,
            side,
        }
    }
}

/// What the engine did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    Reconciled(FileOutcome),
    Retargeted,
    Quarantined(NormalizedPath),
    Ignored,
}

/// Coalesces events per (side, path) until the path has been quiet for the
/// whole window. The latest event for a path replaces earlier ones.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    clock: Arc<dyn Clock>,
    pending: HashMap<(Side, NormalizedPath), (WatchEvent, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            pending: HashMap::new(),
        }
    }

    pub fn push(&mut self, event: WatchEvent) {
        let now = self.clock.now();
        let key = (event.side, event.path.clone());
        let merged = match self.pending.remove(&key) {
            // A create that is still settling stays a create.
            Some((previous, _))
                if previous.kind == EventKind::Created && event.kind == EventKind::Modified =>
            {
                previous
            }
            _ => event,
        };
        self.pending.insert(key, (merged, now));
    }

    /// Events whose window has closed, ordered by path.
    pub fn drain_ready(&mut self) -> Vec<WatchEvent> {
        let now = self.clock.now();
        let window = self.window;
        let mut ready: Vec<WatchEvent> = Vec::new();
        self.pending.retain(|_, (event, stamp)| {
            if now.saturating_duration_since(*stamp) >= window {
                ready.push(event.clone());
                false
            } else {
                true
            }
        });
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
