//! Cooperative timer queue driven by a single external clock.
//!
//! All deferred work in a session (spawn schedulers, grace/danger/censor
//! countdowns, periodic drains, mask pulses) lives here. Events fire in
//! `(deadline, scheduling order)` order, one at a time, so every callback
//! observes the mutations of the callbacks that fired before it.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::chat::Pulse;
use crate::threats::{ThreatChannel, ThreatStep};

/// Opaque handle to a scheduled timer. Handles are never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Work item delivered when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    ChatNormal,
    ChatThreat,
    ClearPulse { message_id: u64, pulse: Pulse },
    Threat { channel: ThreatChannel, step: ThreatStep },
}

#[derive(Debug, Clone)]
struct Entry {
    event: TimerEvent,
    period_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now_ms: u64,
    next_id: u64,
    pending: BTreeMap<(u64, u64), Entry>,
    deadlines: HashMap<u64, u64>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current loop time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule a one-shot event `delay_ms` after the current time.
    pub fn schedule(&mut self, delay_ms: u64, event: TimerEvent) -> TimerHandle {
        self.insert(delay_ms, event, None)
    }

    /// Schedule an event that re-arms every `period_ms` until cancelled.
    pub fn schedule_repeating(&mut self, period_ms: u64, event: TimerEvent) -> TimerHandle {
        let period_ms = period_ms.max(1);
        self.insert(period_ms, event, Some(period_ms))
    }

    fn insert(&mut self, delay_ms: u64, event: TimerEvent, period_ms: Option<u64>) -> TimerHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let deadline = self.now_ms.saturating_add(delay_ms);
        self.pending.insert((deadline, id), Entry { event, period_ms });
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(deadline) = self.deadlines.remove(&handle.0) else {
            return false;
        };
        self.pending.remove(&(deadline, handle.0)).is_some()
    }

    /// Cancel the handle stored in `slot`, leaving the slot empty.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Deadline of the next pending event, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest event due at or before `until_ms`, moving the clock to its deadline.
    ///
    /// Repeating events are re-armed under the same handle before being returned.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, TimerEvent)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > until_ms {
            return None;
        }
        let entry = self.pending.remove(&(deadline, id))?;
        self.now_ms = self.now_ms.max(deadline);
        if let Some(period) = entry.period_ms {
            let next = deadline.saturating_add(period);
            self.pending.insert(
                (next, id),
                Entry {
                    event: entry.event,
                    period_ms: Some(period),
                },
            );
            self.deadlines.insert(id, next);
        } else {
            self.deadlines.remove(&id);
        }
        Some((TimerHandle(id), entry.event))
    }

    /// Move the clock forward without firing anything. Time never moves backwards.
    pub fn advance_clock(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }
}
