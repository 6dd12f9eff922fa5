//! Re-entrancy and feedback-loop protection
//!
//! A reconciliation copies bytes, the copy produces a watch event on the other
//! side, and that event would immediately schedule the reverse direction. The
//! guard absorbs this: a path being reconciled cannot be entered again, and a
//! path reconciled within the cooldown window is skipped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use readme_fs::NormalizedPath;
use tracing::debug;

use crate::clock::Clock;

/// Why a path could not be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InFlight,
    CoolingDown { remaining: Duration },
}

#[derive(Debug, Default)]
struct GuardState {
    active: HashSet<NormalizedPath>,
    recent: HashMap<NormalizedPath, Instant>,
}

#[derive(Debug)]
pub struct ConcurrencyGuard {
    state: Mutex<GuardState>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl ConcurrencyGuard {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            cooldown,
            clock,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter `key` unless it is in flight or cooling down.
    pub fn try_acquire(&self, key: &NormalizedPath) -> Result<SyncPermit<'_>, Rejection> {
        let now = self.clock.now();
        let mut state = self.lock();
        if state.active.contains(key) {
            debug!(path = %key, "skip: reconciliation in flight");
            return Err(Rejection::InFlight);
        }
        if let Some(&stamp) = state.recent.get(key) {
            let elapsed = now.saturating_duration_since(stamp);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                debug!(path = %key, ?remaining, "skip: cooling down");
                return Err(Rejection::CoolingDown { remaining });
            }
        }
        state.active.insert(key.clone());
        Ok(SyncPermit {
            guard: self,
            key: key.clone(),
        })
    }

    /// Enter `key` ignoring the cooldown window, for explicit operator requests.
    pub fn force_acquire(&self, key: &NormalizedPath) -> Result<SyncPermit<'_>, Rejection> {
        let mut state = self.lock();
        if !state.active.insert(key.clone()) {
            return Err(Rejection::InFlight);
        }
        Ok(SyncPermit {
            guard: self,
            key: key.clone(),
        })
    }

    pub fn is_in_flight(&self, key: &NormalizedPath) -> bool {
        self.lock().active.contains(key)
    }

    /// Drop cooldown stamps older than twice the window; returns how many.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let horizon = self.cooldown.saturating_mul(2);
        let mut state = self.lock();
        let before = state.recent.len();
        state
            .recent
            .retain(|_, stamp| now.saturating_duration_since(*stamp) <= horizon);
        before - state.recent.len()
    }

    pub fn tracked(&self) -> usize {
        self.lock().recent.len()
    }

    fn release(&self, key: &NormalizedPath) {
        let now = self.clock.now();
        let mut state = self.lock();
        state.active.remove(key);
        state.recent.insert(key.clone(), now);
    }
}

/// Held while a path is being reconciled; releasing stamps the cooldown.
#[derive(Debug)]
pub struct SyncPermit<'a> {
    guard: &'a ConcurrencyGuard,
    key: NormalizedPath,
}

impl SyncPermit<'_> {
    pub fn key(&self) -> &NormalizedPath {
        &self.key
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.key);
    }
}
