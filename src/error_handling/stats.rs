//! Check statistics tracking.
//!
//! Thread-safe counters for the events of the check pipeline, shared between
//! request handlers, host tasks and the output writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;

use super::types::CheckEvent;

/// Thread-safe event counters.
///
/// Every `CheckEvent` variant is initialized to zero on creation, so lookups
/// never miss. Share it across tasks with `Arc`.
pub struct CheckStats {
    events: HashMap<CheckEvent, AtomicUsize>,
}

impl CheckStats {
    pub fn new() -> Self {
        let mut events = HashMap::new();
        for event in CheckEvent::iter() {
            events.insert(event, AtomicUsize::new(0));
        }
        CheckStats { events }
    }

    /// Increment an event counter.
    pub fn increment(&self, event: CheckEvent) {
        if let Some(counter) = self.events.get(&event) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in CheckStats initialization.",
                event
            );
        }
    }

    /// Get the count for an event.
    pub fn get(&self, event: CheckEvent) -> usize {
        self.events
            .get(&event)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Snapshot of all non-zero counters, in declaration order.
    pub fn snapshot(&self) -> Vec<(CheckEvent, usize)> {
        CheckEvent::iter()
            .map(|event| (event, self.get(event)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

impl Default for CheckStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every non-zero counter at info level.
pub fn print_check_statistics(stats: &CheckStats) {
    let snapshot = stats.snapshot();
    if snapshot.is_empty() {
        log::info!("No checks were processed");
        return;
    }
    log::info!("Check statistics:");
    for (event, count) in snapshot {
        log::info!("   {}: {}", event, count);
    }
}
