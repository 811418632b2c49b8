//! Assembly session - the event loop around the verification reducer
//!
//! The session owns everything with a lifetime: the order context, the timer
//! queue, the weight coordinator, the scan debounce and the notification gate.
//! Each event (scan, tick, operator action) is processed to completion, and
//! follow-up events are handled in the order they were issued.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use packcheck_domain::model::{Checklist, ItemStatus, Notification, PollingMode, StatusCounts, WeightTolerancePolicy};
use packcheck_domain::repository::{NotificationSink, ScaleDevice};
use packcheck_domain::service::{
    match_barcode, reduce, Effect, ScanDebounce, ScanRejection, SettleKind, VerificationEvent, VerificationState,
};
use packcheck_types::{Error, Severity};

use crate::assembly_service::PreparedOrder;
use crate::config::Config;
use crate::notify::NotificationGate;
use crate::polling::WeightCoordinator;
use crate::timer::{TimerKind, TimerQueue};

/// Errors specific to the assembly session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No order loaded")]
    NoOrderLoaded,

    #[error("Order {order_id} is not verified yet ({done}/{total} portions)")]
    Incomplete { order_id: String, done: u32, total: u32 },

    #[error(transparent)]
    Core(#[from] Error),
}

/// What happened to a scanned code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Selected(String),
    /// Same code inside the cooldown window
    Debounced,
    Rejected(ScanRejection),
    /// No order in view
    Ignored,
}

/// Serializable view of a session for reports
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub order_id: Option<String>,
    pub epoch: u64,
    pub active_box: usize,
    pub polling_mode: PollingMode,
    pub weighing_paused: bool,
    pub ready: bool,
    pub portions_done: u32,
    pub portions_total: u32,
    pub unallocated_portions: u32,
    pub counts: StatusCounts,
}

pub struct AssemblySession<D: ScaleDevice, N: NotificationSink> {
    id: Uuid,
    config: Config,
    policy: WeightTolerancePolicy,
    order: Option<PreparedOrder>,
    in_view: bool,
    state: VerificationState,
    timers: TimerQueue,
    scale: WeightCoordinator<D>,
    debounce: ScanDebounce,
    gate: NotificationGate,
    sink: N,
    transitions: usize,
}

impl<D: ScaleDevice, N: NotificationSink> AssemblySession<D, N> {
    pub fn new(device: D, sink: N, config: Config, policy: WeightTolerancePolicy) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "assembly session created");
        Self {
            id,
            scale: WeightCoordinator::new(device, &config),
            debounce: ScanDebounce::new(config.scan_cooldown()),
            gate: NotificationGate::new(config.notification_cooldown()),
            config,
            policy: policy.or_default(),
            order: None,
            in_view: false,
            state: VerificationState::default(),
            timers: TimerQueue::new(),
            sink,
            transitions: 0,
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn order(&self) -> Option<&PreparedOrder> {
        self.order.as_ref()
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn checklist(&self) -> &Checklist {
        &self.state.checklist
    }

    pub fn active_box(&self) -> usize {
        self.state.active_box
    }

    pub fn epoch(&self) -> u64 {
        self.timers.epoch()
    }

    pub fn polling_mode(&self) -> PollingMode {
        self.scale.mode()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of reducer steps that produced effects
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn device(&self) -> &D {
        self.scale.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.scale.device_mut()
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn set_polling_preference(&mut self, preference: PollingMode, now: DateTime<Utc>) {
        self.scale.set_preference(preference, now);
    }

    // ========================================
    // Order lifecycle
    // ========================================

    /// Make `prepared` the order in view
    ///
    /// Bumps the order epoch, so every timer of the previous order is
    /// dropped, and rebuilds all per-order state including the live reading,
    /// the weight baseline and the scan/notification caches.
    pub fn load_order(&mut self, prepared: PreparedOrder, now: DateTime<Utc>) {
        let epoch = self.timers.bump_epoch();
        self.scale.reset();
        self.debounce.reset();
        self.gate.reset();
        self.state = VerificationState::new(prepared.checklist.clone());
        self.in_view = true;

        tracing::info!(
            session = %self.id,
            order = %prepared.order_id(),
            epoch,
            rows = prepared.checklist.len(),
            "order loaded"
        );

        if !prepared.weighing_enabled {
            self.state.weighing_paused = true;
            let notification = Notification::new(
                Severity::Error,
                "Weighing disabled",
                prepared.issues.join("; "),
            )
            .with_key("weighing:disabled");
            self.order = Some(prepared);
            self.notify(notification, now);
        } else {
            self.order = Some(prepared);
        }

        if let Some(overflow) = self.overflow_error() {
            let labels = self
                .order
                .as_ref()
                .map(|o| o.plan.overflow_labels().join(", "))
                .unwrap_or_default();
            tracing::warn!(order = ?self.order.as_ref().map(|o| o.order_id()), "{}", overflow);
            let notification = Notification::new(Severity::Warning, overflow.to_string(), labels)
                .with_key("plan:overflow")
                .with_timeout_ms(10_000);
            self.notify(notification, now);
        }

        self.scale.reserve(now);
        self.dispatch(VerificationEvent::SetActiveBox { box_index: 0 }, now);
    }

    /// Leave the assembly view: all timers are dropped and polling stops.
    /// The checklist stays available for reporting.
    pub fn leave(&mut self) {
        let epoch = self.timers.bump_epoch();
        self.scale.idle();
        self.in_view = false;
        tracing::info!(session = %self.id, epoch, "assembly view left");
    }

    pub fn is_ready(&self) -> bool {
        self.order.is_some() && self.state.checklist.is_complete() && self.overflow_error().is_none()
    }

    /// Confirm the order can be shipped
    pub fn mark_ready(&self) -> Result<(), SessionError> {
        let order = self.order.as_ref().ok_or(SessionError::NoOrderLoaded)?;
        if let Some(overflow) = self.overflow_error() {
            return Err(overflow.into());
        }
        if !self.state.checklist.is_complete() {
            let (done, total) = self.state.checklist.portions_progress();
            return Err(SessionError::Incomplete {
                order_id: order.order_id().to_string(),
                done,
                total,
            });
        }
        Ok(())
    }

    fn overflow_error(&self) -> Option<Error> {
        let plan = &self.order.as_ref()?.plan;
        if !plan.has_overflow() {
            return None;
        }
        Some(Error::AllocationOverflow {
            portions: plan.unallocated_portions,
            items: plan.overflow_labels(),
        })
    }

    // ========================================
    // Operator actions
    // ========================================

    pub fn handle_scan(&mut self, code: &str, now: DateTime<Utc>) -> ScanOutcome {
        if !self.in_view {
            return ScanOutcome::Ignored;
        }
        if !self.debounce.admit(code, now, self.config.debug_scan) {
            tracing::debug!(code, "scan debounced");
            return ScanOutcome::Debounced;
        }

        match match_barcode(code, &self.state.checklist, self.state.active_box) {
            Ok(item_id) => {
                tracing::debug!(code, item = %item_id, "scan matched");
                self.dispatch(
                    VerificationEvent::Select {
                        item_id: item_id.clone(),
                    },
                    now,
                );
                ScanOutcome::Selected(item_id)
            }
            Err(rejection) => {
                tracing::warn!(code, "scan rejected: {}", rejection.message());
                let notification = Notification::new(Severity::Warning, "Scan rejected", rejection.message())
                    .with_key(rejection.dedupe_key());
                self.notify(notification, now);
                ScanOutcome::Rejected(rejection)
            }
        }
    }

    pub fn select_item(&mut self, item_id: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.operator_event(
            VerificationEvent::Select {
                item_id: item_id.to_string(),
            },
            now,
        )
    }

    pub fn confirm_box(&mut self, box_index: usize, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.operator_event(VerificationEvent::ConfirmBox { box_index }, now)
    }

    pub fn set_active_box(&mut self, box_index: usize, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.operator_event(VerificationEvent::SetActiveBox { box_index }, now)
    }

    fn operator_event(&mut self, event: VerificationEvent, now: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.in_view {
            return Err(SessionError::NoOrderLoaded);
        }
        self.dispatch(event, now);
        Ok(())
    }

    // ========================================
    // Clock
    // ========================================

    /// Advance the session clock: fire due timers, drain the scanner, then
    /// poll the scale if the cadence says so
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if !self.in_view {
            return;
        }

        for timer in self.timers.pop_due(now) {
            match timer {
                TimerKind::Settle { item_id, .. } => {
                    self.dispatch(VerificationEvent::SettleElapsed { item_id }, now);
                }
                TimerKind::FreshReading => self.evaluate_fresh(now),
            }
        }

        while let Some(code) = self.scale.device_mut().take_barcode() {
            self.handle_scan(&code, now);
        }

        if let Some(result) = self.scale.poll(now) {
            match result {
                Ok(reading) => self.dispatch(VerificationEvent::Reading { reading }, now),
                Err(e) => self.hardware_failure(e, now),
            }
        }
    }

    fn evaluate_fresh(&mut self, now: DateTime<Utc>) {
        match self.scale.fresh_reading(now) {
            Ok(reading) => self.dispatch(VerificationEvent::Reading { reading }, now),
            Err(e) => self.hardware_failure(e, now),
        }
    }

    /// Hardware errors are reported and never move the state machine
    fn hardware_failure(&mut self, error: Error, now: DateTime<Utc>) {
        tracing::warn!(session = %self.id, "scale read failed: {}", error);
        let notification = Notification::new(Severity::Error, "Scale unavailable", error.to_string())
            .with_key("hardware:scale");
        self.notify(notification, now);
    }

    // ========================================
    // Reducer plumbing
    // ========================================

    fn dispatch(&mut self, event: VerificationEvent, now: DateTime<Utc>) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let transition = reduce(&self.state, &event, &self.policy);
            self.state = transition.state;
            if !transition.effects.is_empty() {
                self.transitions += 1;
            }
            for effect in transition.effects {
                self.apply_effect(effect, now, &mut queue);
            }
        }
    }

    fn apply_effect(&mut self, effect: Effect, now: DateTime<Utc>, queue: &mut VecDeque<VerificationEvent>) {
        match effect {
            Effect::ItemPending { item_id } => {
                tracing::debug!(item = %item_id, "awaiting weight");
                self.scale.activate(now);
                self.timers.schedule(TimerKind::FreshReading, now);
            }
            Effect::ScheduleSettle { item_id, kind } => {
                let delay = match kind {
                    SettleKind::Success => self.config.success_settle(),
                    SettleKind::Error => self.config.error_settle(),
                };
                self.timers.schedule(TimerKind::Settle { item_id, kind }, now + delay);
            }
            Effect::Verified {
                item_id,
                actual,
                expected,
                tolerance,
            } => {
                let name = self.item_name(&item_id);
                tracing::info!(item = %item_id, actual, expected, tolerance, "verified");
                let notification = Notification::new(
                    Severity::Success,
                    "Verified",
                    format!("{}: {:.3} kg (expected {:.3} ± {:.3})", name, actual, expected, tolerance),
                )
                .with_key(format!("verify:{}", item_id))
                .with_timeout_ms(1500);
                self.notify(notification, now);
                let another_pending = self.state.checklist.has_pending();
                self.scale.on_success(now, another_pending);
            }
            Effect::WeightMismatch {
                item_id,
                actual,
                expected,
                tolerance,
            } => {
                let name = self.item_name(&item_id);
                tracing::info!(item = %item_id, actual, expected, tolerance, "weight mismatch");
                let notification = Notification::new(
                    Severity::Error,
                    "Weight mismatch",
                    format!("{}: {:.3} kg, expected {:.3} ± {:.3}", name, actual, expected, tolerance),
                )
                .with_key(format!("weight:{}", item_id));
                self.notify(notification, now);
            }
            Effect::BoxCompleted { box_index } => {
                tracing::info!(box_index, "box complete");
                let notification = Notification::new(
                    Severity::Success,
                    format!("Box {} complete", box_index + 1),
                    "",
                )
                .with_key(format!("box:done:{}", box_index));
                self.notify(notification, now);
                if self.config.auto_advance_box {
                    if let Some(next) = self.next_open_box(box_index) {
                        queue.push_back(VerificationEvent::SetActiveBox { box_index: next });
                    }
                }
            }
            Effect::OrderComplete => {
                self.scale.reserve(now);
                let order_id = self.order.as_ref().map(|o| o.order_id().to_string()).unwrap_or_default();
                match self.overflow_error() {
                    Some(overflow) => {
                        tracing::warn!(order = %order_id, "all rows verified but {}", overflow);
                        let notification =
                            Notification::new(Severity::Warning, "Order not ready", overflow.to_string())
                                .with_key("plan:overflow");
                        self.notify(notification, now);
                    }
                    None => {
                        tracing::info!(order = %order_id, "order ready");
                        let notification = Notification::new(Severity::Success, "Order ready", order_id)
                            .with_key("order:ready");
                        self.notify(notification, now);
                    }
                }
            }
            Effect::Rejected(rejection) => {
                tracing::warn!("rejected: {}", rejection.message());
                let notification = Notification::new(Severity::Warning, "Action rejected", rejection.message())
                    .with_key(rejection.dedupe_key());
                self.notify(notification, now);
            }
        }
    }

    fn item_name(&self, item_id: &str) -> String {
        self.state
            .checklist
            .get(item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| item_id.to_string())
    }

    fn next_open_box(&self, after: usize) -> Option<usize> {
        self.state
            .checklist
            .items()
            .iter()
            .filter(|item| item.is_box() && item.box_index > after)
            .find(|item| item.status != ItemStatus::Done)
            .map(|item| item.box_index)
    }

    fn notify(&mut self, notification: Notification, now: DateTime<Utc>) {
        if self.gate.admit(&notification, now) {
            self.sink.notify(&notification);
        } else {
            tracing::debug!(key = %notification.dedupe_key, "notification suppressed");
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (portions_done, portions_total) = self.state.checklist.portions_progress();
        SessionSnapshot {
            session_id: self.id.to_string(),
            order_id: self.order.as_ref().map(|o| o.order_id().to_string()),
            epoch: self.timers.epoch(),
            active_box: self.state.active_box,
            polling_mode: self.scale.mode(),
            weighing_paused: self.state.weighing_paused,
            ready: self.is_ready(),
            portions_done,
            portions_total,
            unallocated_portions: self.order.as_ref().map(|o| o.plan.unallocated_portions).unwrap_or(0),
            counts: self.state.checklist.status_counts(),
        }
    }
}
