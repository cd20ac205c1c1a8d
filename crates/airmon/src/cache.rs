// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded FIFO history of formatted event lines.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default history capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Order-preserving event history with a hard capacity.
///
/// Both receivers (telemetry and alerts) append; the menu reads. A single
/// exclusive lock covers mutation and snapshot - the critical sections are
/// short enough that a separate read lock buys nothing.
#[derive(Debug)]
pub struct EventCache {
    events: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl EventCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append one event line, evicting the oldest entry when full.
    pub fn add(&self, event: impl Into<String>) {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.into());
    }

    /// Point-in-time copy of the history, oldest first.
    ///
    /// The copy does not reflect later additions.
    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
