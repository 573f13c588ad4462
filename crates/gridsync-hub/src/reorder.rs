//! Per-stream reorder buffer for events arriving over the [`crate::Bus`]
//! out of `seq` order: a bus message can be delivered before
//! an earlier-seq message published by another instance. Events are
//! held until the next expected `seq` arrives, up to a bounded window;
//! past that, the gap is filled by reading the missing range straight
//! from the store.

use std::collections::BTreeMap;
use std::time::Duration;

use gridsync_core::event::{PersistedEvent, Seq};

/// Default window a reorder buffer waits for a missing `seq` before
/// falling back to a gap-fill read.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(250);

/// Buffers out-of-order events for one stream and releases them in
/// ascending `seq` order. Not thread-safe by itself; owned by exactly
/// one bus-relay task per stream.
pub struct ReorderBuffer {
    next_expected: Option<Seq>,
    pending: BTreeMap<Seq, PersistedEvent>,
}

impl ReorderBuffer {
    #[must_use]
    pub fn new() -> Self {
        ReorderBuffer {
            next_expected: None,
            pending: BTreeMap::new(),
        }
    }

    /// Feeds one incoming event, returning every event now ready for
    /// delivery in ascending `seq` order (possibly more than one, if
    /// this event fills a gap).
    pub fn push(&mut self, event: PersistedEvent) -> Vec<PersistedEvent> {
        let next_expected = *self.next_expected.get_or_insert(event.seq);

        if event.seq < next_expected {
            // Already delivered (a duplicate from the bus's
            // at-least-once delivery, or a gap-fill overlap).
            return Vec::new();
        }

        self.pending.insert(event.seq, event);
        self.drain_ready()
    }

    fn drain_ready(&mut self) -> Vec<PersistedEvent> {
        let mut ready = Vec::new();
        loop {
            let Some(next) = self.next_expected else {
                break;
            };
            match self.pending.remove(&next) {
                Some(event) => {
                    self.next_expected = Some(next + 1);
                    ready.push(event);
                }
                None => break,
            }
        }
        ready
    }

    /// Whether the buffer is holding events that can't be released
    /// because of a gap before them.
    #[must_use]
    pub fn has_gap(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The sequence number a gap-fill read should start from.
    #[must_use]
    pub fn next_expected(&self) -> Option<Seq> {
        self.next_expected
    }

    /// Called after a gap-fill read of `[next_expected, ..]` succeeds:
    /// folds the fetched range in, advancing past whatever it covers
    /// and keeping any buffered events past the fetched range.
    pub fn resolve_gap(&mut self, fetched: Vec<PersistedEvent>) -> Vec<PersistedEvent> {
        let mut ready = fetched;
        if let Some(last) = ready.last() {
            self.next_expected = Some(last.seq + 1);
        }
        ready.extend(self.drain_ready());
        ready
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new()
    }
}
