//! Weight acquisition coordinator
//!
//! Decides how often the scale is polled and owns the single live reading.
//! Modes:
//! - idle: nothing is polled (assembly view left)
//! - reserve: slow polling for the live display
//! - active: fast polling while an item is pending, demoted to reserve after
//!   the active timeout

use chrono::{DateTime, Duration, Utc};
use packcheck_domain::model::{PollingMode, ScaleReading};
use packcheck_domain::repository::ScaleDevice;
use packcheck_types::Result;

use crate::config::Config;

/// Fixed-interval cadence with an explicit start and stop
#[derive(Debug, Clone)]
pub struct PollingTimer {
    interval: Duration,
    next_due: Option<DateTime<Utc>>,
}

impl PollingTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Start ticking; the first tick is due immediately
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Whether a tick is due at `now`; a due tick schedules the next one
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

pub struct WeightCoordinator<D: ScaleDevice> {
    device: D,
    mode: PollingMode,
    /// `Auto` lets pending items drive the mode
    preference: PollingMode,
    activated_at: Option<DateTime<Utc>>,
    active_timeout: Duration,
    reserve_interval: Duration,
    active_interval: Duration,
    freshness: Duration,
    timer: PollingTimer,
    latest: Option<ScaleReading>,
}

impl<D: ScaleDevice> WeightCoordinator<D> {
    pub fn new(device: D, config: &Config) -> Self {
        Self {
            device,
            mode: PollingMode::Idle,
            preference: PollingMode::Auto,
            activated_at: None,
            active_timeout: config.active_timeout(),
            reserve_interval: config.reserve_poll(),
            active_interval: config.active_poll(),
            freshness: config.reading_freshness(),
            timer: PollingTimer::new(config.reserve_poll()),
            latest: None,
        }
    }

    /// Pin the mode instead of following pending items. `Auto` restores
    /// automatic switching.
    pub fn set_preference(&mut self, preference: PollingMode, now: DateTime<Utc>) {
        self.preference = preference;
        match preference {
            PollingMode::Active => self.activate(now),
            PollingMode::Reserve => self.reserve(now),
            PollingMode::Idle => self.idle(),
            PollingMode::Auto => {}
        }
    }

    pub fn mode(&self) -> PollingMode {
        self.mode
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Latest reading taken by the coordinator
    pub fn latest(&self) -> Option<&ScaleReading> {
        self.latest.as_ref()
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        if matches!(self.preference, PollingMode::Reserve | PollingMode::Idle) {
            return;
        }
        // Renew the timeout on every new pending item
        self.activated_at = Some(now);
        if self.mode != PollingMode::Active {
            tracing::debug!(from = self.mode.label(), "active polling");
            self.mode = PollingMode::Active;
            self.device.start_active_polling();
            self.timer.set_interval(self.active_interval);
            self.timer.start(now);
        }
    }

    pub fn reserve(&mut self, now: DateTime<Utc>) {
        if self.preference == PollingMode::Active || self.preference == PollingMode::Idle {
            return;
        }
        self.activated_at = None;
        if self.mode != PollingMode::Reserve {
            tracing::debug!(from = self.mode.label(), "reserve polling");
            self.mode = PollingMode::Reserve;
            self.device.start_reserve_polling();
            self.timer.set_interval(self.reserve_interval);
            self.timer.start(now);
        }
    }

    /// Stop every kind of polling
    pub fn idle(&mut self) {
        self.activated_at = None;
        self.timer.stop();
        if self.mode != PollingMode::Idle {
            tracing::debug!(from = self.mode.label(), "polling stopped");
            self.mode = PollingMode::Idle;
            self.device.stop_active_polling();
        }
    }

    /// A verification succeeded; fast polling is only kept while another
    /// item is still pending
    pub fn on_success(&mut self, now: DateTime<Utc>, another_pending: bool) {
        if !another_pending && self.mode == PollingMode::Active {
            self.reserve(now);
        }
    }

    /// Drop the live reading (order switch)
    pub fn reset(&mut self) {
        self.latest = None;
    }

    /// Poll the scale if the cadence says so
    ///
    /// Returns `None` when no poll was due. Active mode past its timeout is
    /// demoted to reserve first.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Result<ScaleReading>> {
        if let (PollingMode::Active, Some(since)) = (self.mode, self.activated_at) {
            if now - since >= self.active_timeout && self.preference == PollingMode::Auto {
                tracing::debug!(timeout_ms = self.active_timeout.num_milliseconds(), "active polling timed out");
                self.reserve(now);
            }
        }
        if !self.timer.on_tick(now) {
            return None;
        }
        Some(self.read(now))
    }

    /// The live reading if it is fresh enough, otherwise a new one from the device
    pub fn fresh_reading(&mut self, now: DateTime<Utc>) -> Result<ScaleReading> {
        match self.latest {
            Some(reading) if reading.age_ms(now) <= self.freshness.num_milliseconds() => Ok(reading),
            _ => self.read(now),
        }
    }

    fn read(&mut self, now: DateTime<Utc>) -> Result<ScaleReading> {
        let reading = self.device.current_weight()?;
        tracing::trace!(weight = reading.weight, stable = reading.is_stable, at = %now, "scale reading");
        self.latest = Some(reading);
        Ok(reading)
    }
}
