//! Owned timer queue keyed by order epoch
//!
//! Every timer carries the epoch it was armed in. Loading another order or
//! leaving the view bumps the epoch and clears the queue; a timer whose epoch
//! no longer matches is dropped instead of fired.

use chrono::{DateTime, Utc};
use packcheck_domain::service::SettleKind;
use packcheck_types::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Settle delay of a verified or failed item
    Settle { item_id: String, kind: SettleKind },
    /// Request a fresh reading before evaluation
    FreshReading,
}

#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub due: DateTime<Utc>,
    pub epoch: u64,
    pub kind: TimerKind,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<ScheduledTimer>,
    epoch: u64,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a new order context; every armed timer is discarded
    pub fn bump_epoch(&mut self) -> u64 {
        if !self.timers.is_empty() {
            tracing::debug!(dropped = self.timers.len(), epoch = self.epoch, "clearing timers");
        }
        self.timers.clear();
        self.epoch += 1;
        self.epoch
    }

    /// Arm a timer in the current epoch. A timer of the same kind for the
    /// same target is replaced.
    pub fn schedule(&mut self, kind: TimerKind, due: DateTime<Utc>) {
        self.cancel(&kind);
        self.push(kind, due, self.epoch);
    }

    fn push(&mut self, kind: TimerKind, due: DateTime<Utc>, epoch: u64) {
        self.timers.push(ScheduledTimer {
            due,
            epoch,
            kind,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    pub fn cancel(&mut self, kind: &TimerKind) {
        self.timers.retain(|timer| !same_target(&timer.kind, kind));
    }

    /// Check that a timer armed in `armed` may still fire
    pub fn validate(&self, armed: u64) -> Result<()> {
        if armed == self.epoch {
            Ok(())
        } else {
            Err(Error::StaleOrderContext {
                armed,
                current: self.epoch,
            })
        }
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<TimerKind> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self.timers.drain(..).partition(|timer| timer.due <= now);
        self.timers = rest;
        due.sort_by_key(|timer| (timer.due, timer.seq));

        let mut fired = Vec::with_capacity(due.len());
        for timer in due {
            match self.validate(timer.epoch) {
                Ok(()) => fired.push(timer.kind),
                Err(e) => tracing::debug!(kind = ?timer.kind, "dropping timer: {}", e),
            }
        }
        fired
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.iter().map(|timer| timer.due).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

fn same_target(a: &TimerKind, b: &TimerKind) -> bool {
    match (a, b) {
        (TimerKind::Settle { item_id: x, .. }, TimerKind::Settle { item_id: y, .. }) => x == y,
        (TimerKind::FreshReading, TimerKind::FreshReading) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn settle(id: &str) -> TimerKind {
        TimerKind::Settle {
            item_id: id.to_string(),
            kind: SettleKind::Success,
        }
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(settle("b"), t(600));
        queue.schedule(settle("a"), t(300));
        queue.schedule(TimerKind::FreshReading, t(900));

        assert!(queue.pop_due(t(100)).is_empty());
        assert_eq!(queue.pop_due(t(700)), vec![settle("a"), settle("b")]);
        assert_eq!(queue.next_due(), Some(t(900)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_rescheduling_replaces_same_target() {
        let mut queue = TimerQueue::new();
        queue.schedule(settle("a"), t(300));
        queue.schedule(
            TimerKind::Settle {
                item_id: "a".to_string(),
                kind: SettleKind::Error,
            },
            t(500),
        );
        assert_eq!(queue.len(), 1);
        assert!(queue.pop_due(t(400)).is_empty());
    }

    #[test]
    fn test_bump_epoch_drops_everything() {
        let mut queue = TimerQueue::new();
        queue.schedule(settle("a"), t(300));
        assert_eq!(queue.bump_epoch(), 1);
        assert!(queue.is_empty());
        assert!(queue.pop_due(t(1000)).is_empty());
    }

    #[test]
    fn test_stale_epoch_is_rejected() {
        let mut queue = TimerQueue::new();
        queue.push(settle("old"), t(100), 0);
        queue.bump_epoch();
        queue.push(settle("stale"), t(100), 0);
        queue.schedule(settle("fresh"), t(100));

        assert!(matches!(
            queue.validate(0),
            Err(Error::StaleOrderContext { armed: 0, current: 1 })
        ));
        assert_eq!(queue.pop_due(t(200)), vec![settle("fresh")]);
    }
}
