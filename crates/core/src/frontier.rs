//! De-duplicating work queue with per-key in-flight exclusion.
//!
//! A [`Frontier`] pairs a FIFO of pending keys with the set of keys currently
//! being worked on. A key is never pending twice, never pending while in flight,
//! and held by at most one worker at a time. This is the only concurrency control
//! the collector needs: every unit of work is idempotent, so losing or repeating
//! one only delays convergence until the next rescan.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<String>,
    pending: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Pending queue plus in-flight set over string keys.
#[derive(Debug)]
pub struct Frontier {
    name: &'static str,
    state: Mutex<FrontierState>,
}

/// Point-in-time view of a frontier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub pending: Vec<String>,
    pub in_flight: Vec<String>,
}

impl Frontier {
    /// Create an empty frontier. `name` labels logs and metrics.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(FrontierState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(frontier = self.name, "frontier mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Append `key` unless it is already pending or in flight.
    ///
    /// Returns whether the key was added.
    pub fn enqueue(&self, key: &str) -> bool {
        let mut state = self.lock();
        if state.pending.contains(key) || state.in_flight.contains(key) {
            return false;
        }
        state.pending.insert(key.to_string());
        state.queue.push_back(key.to_string());
        true
    }

    /// Pop the head of the queue and mark it in flight.
    ///
    /// Returns `None` when the queue is empty, and also when the popped key is
    /// already in flight; in that case the key is dropped rather than requeued,
    /// and the holder's next rescan rediscovers whatever it still needs.
    pub fn try_begin(&self) -> Option<String> {
        let mut state = self.lock();
        let key = state.queue.pop_front()?;
        state.pending.remove(&key);
        if state.in_flight.contains(&key) {
            tracing::debug!(frontier = self.name, key = %key, "key already in flight, dropping");
            return None;
        }
        state.in_flight.insert(key.clone());
        Some(key)
    }

    /// Release `key` from the in-flight set.
    ///
    /// Must be called once for every key returned by [`Frontier::try_begin`].
    pub fn end(&self, key: &str) {
        let mut state = self.lock();
        if !state.in_flight.remove(key) {
            tracing::warn!(frontier = self.name, key = %key, "released a key that was not in flight");
        }
    }

    /// Like [`Frontier::try_begin`], but releases the key when the lease drops.
    pub fn try_lease(self: &Arc<Self>) -> Option<Lease> {
        self.try_begin().map(|key| Lease {
            frontier: Arc::clone(self),
            key,
        })
    }

    /// Whether `key` is pending or in flight.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.lock();
        state.pending.contains(key) || state.in_flight.contains(key)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.lock().in_flight.contains(key)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// True when nothing is pending and nothing is in flight.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.queue.is_empty() && state.in_flight.is_empty()
    }

    /// Pending keys in queue order.
    pub fn pending(&self) -> Vec<String> {
        self.lock().queue.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> FrontierSnapshot {
        let state = self.lock();
        let mut in_flight: Vec<String> = state.in_flight.iter().cloned().collect();
        in_flight.sort();
        FrontierSnapshot {
            pending: state.queue.iter().cloned().collect(),
            in_flight,
        }
    }
}

/// An in-flight key that is released on drop, including on panic or task cancellation.
#[derive(Debug)]
pub struct Lease {
    frontier: Arc<Frontier>,
    key: String,
}

impl Lease {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.frontier.end(&self.key);
    }
}
