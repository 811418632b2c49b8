//! Verification state machine
//!
//! A pure reducer: `reduce(state, event, policy)` returns the next state and
//! the side effects the caller has to carry out (timers, polling, alerts).
//! No clock, hardware or notification access happens here.
//!
//! Invariants kept by every transition:
//! - at most one item per box is `Pending`
//! - `Done` items never change
//! - a rejected event leaves the state untouched

use serde::{Deserialize, Serialize};

use crate::model::{Checklist, ItemKind, ItemStatus, ScaleReading, WeightTolerancePolicy};
use crate::service::barcode_matcher::ScanRejection;
use crate::service::tolerance::{calculate_tolerance, is_within_tolerance};

/// Readings closer than this to a weight that just failed are not re-evaluated
const SAME_WEIGHT_KG: f64 = 0.0005;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationState {
    pub checklist: Checklist,
    pub active_box: usize,
    /// Last reading that went through an evaluation
    pub last_evaluated: Option<ScaleReading>,
    /// Item id and weight of the most recent failed evaluation
    pub failed_weight: Option<(String, f64)>,
    /// Weight on the scale at the last successful evaluation, kept across
    /// box switches until something new is placed
    pub baseline_weight: Option<f64>,
    /// Set once the order is complete or weighing is disabled
    pub weighing_paused: bool,
}

impl VerificationState {
    pub fn new(checklist: Checklist) -> Self {
        let weighing_paused = checklist.is_complete();
        Self {
            checklist,
            weighing_paused,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationEvent {
    /// Operator picked an item, directly or through a scan
    Select { item_id: String },
    /// A reading from the scale
    Reading { reading: ScaleReading },
    /// The settle delay armed for `item_id` ran out
    SettleElapsed { item_id: String },
    /// Operator confirmed a box without weighing it
    ConfirmBox { box_index: usize },
    /// Operator switched the active box
    SetActiveBox { box_index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleKind {
    Success,
    Error,
}

/// Why an operator action was refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    Scan(ScanRejection),
    UnknownItem { item_id: String },
    AlreadyDone { item_id: String, name: String },
    OtherBox { item_id: String, name: String, box_index: usize, active_box: usize },
    BoxNotConfirmed { item_id: String, name: String, box_index: usize },
    NoSuchBox { box_index: usize },
    WeighingPaused,
}

impl Rejection {
    pub fn dedupe_key(&self) -> String {
        match self {
            Rejection::Scan(scan) => scan.dedupe_key(),
            Rejection::UnknownItem { item_id } => format!("select:unknown:{}", item_id),
            Rejection::AlreadyDone { item_id, .. } => format!("select:done:{}", item_id),
            Rejection::OtherBox { item_id, box_index, .. } => {
                format!("select:other-box:{}:{}", item_id, box_index)
            }
            Rejection::BoxNotConfirmed { box_index, .. } => {
                format!("select:box-unconfirmed:{}", box_index)
            }
            Rejection::NoSuchBox { box_index } => format!("box:missing:{}", box_index),
            Rejection::WeighingPaused => "weighing:paused".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Rejection::Scan(scan) => scan.message(),
            Rejection::UnknownItem { item_id } => format!("Item {} is not in the checklist", item_id),
            Rejection::AlreadyDone { name, .. } => format!("{} is already packed", name),
            Rejection::OtherBox { name, box_index, active_box, .. } => format!(
                "{} belongs to box {}, active box is {}",
                name,
                box_index + 1,
                active_box + 1
            ),
            Rejection::BoxNotConfirmed { name, box_index, .. } => {
                format!("Confirm box {} before packing {}", box_index + 1, name)
            }
            Rejection::NoSuchBox { box_index } => format!("Box {} does not exist", box_index + 1),
            Rejection::WeighingPaused => "Weighing is paused for this order".to_string(),
        }
    }
}

/// Work the caller performs after a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// An item became pending; poll fast and make sure a fresh reading arrives
    ItemPending { item_id: String },
    /// Arm the settle timer for `item_id`
    ScheduleSettle { item_id: String, kind: SettleKind },
    /// A verification succeeded
    Verified { item_id: String, actual: f64, expected: f64, tolerance: f64 },
    /// A verification failed; recoverable by re-weighing
    WeightMismatch { item_id: String, actual: f64, expected: f64, tolerance: f64 },
    /// Every product of the box is done
    BoxCompleted { box_index: usize },
    /// All items verified; weighing pauses
    OrderComplete,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: VerificationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &VerificationState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }

    fn rejected(state: &VerificationState, rejection: Rejection) -> Self {
        Self {
            state: state.clone(),
            effects: vec![Effect::Rejected(rejection)],
        }
    }
}

pub fn reduce(state: &VerificationState, event: &VerificationEvent, policy: &WeightTolerancePolicy) -> Transition {
    let transition = match event {
        VerificationEvent::Select { item_id } => select(state, item_id),
        VerificationEvent::Reading { reading } => weigh(state, reading, policy),
        VerificationEvent::SettleElapsed { item_id } => settle(state, item_id),
        VerificationEvent::ConfirmBox { box_index } => confirm_box(state, *box_index),
        VerificationEvent::SetActiveBox { box_index } => set_active_box(state, *box_index),
    };
    debug_assert!(transition.state.checklist.pending_invariant_holds());
    transition
}

fn select(state: &VerificationState, item_id: &str) -> Transition {
    let Some(item) = state.checklist.get(item_id) else {
        return Transition::rejected(
            state,
            Rejection::UnknownItem {
                item_id: item_id.to_string(),
            },
        );
    };

    if item.status.is_terminal() || (item.is_box() && item.status == ItemStatus::Confirmed) {
        return Transition::rejected(
            state,
            Rejection::AlreadyDone {
                item_id: item.id.clone(),
                name: item.name.clone(),
            },
        );
    }
    if state.weighing_paused {
        return Transition::rejected(state, Rejection::WeighingPaused);
    }
    if item.box_index != state.active_box {
        return Transition::rejected(
            state,
            Rejection::OtherBox {
                item_id: item.id.clone(),
                name: item.name.clone(),
                box_index: item.box_index,
                active_box: state.active_box,
            },
        );
    }
    if item.is_product() && !state.checklist.is_box_confirmed(item.box_index) {
        return Transition::rejected(
            state,
            Rejection::BoxNotConfirmed {
                item_id: item.id.clone(),
                name: item.name.clone(),
                box_index: item.box_index,
            },
        );
    }
    // Already selected, or verified and waiting for the settle delay
    if matches!(item.status, ItemStatus::Pending | ItemStatus::Success) {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let effects = make_pending(&mut next, item_id);
    Transition { state: next, effects }
}

/// Set `item_id` pending, dropping any other selection in the same box
fn make_pending(state: &mut VerificationState, item_id: &str) -> Vec<Effect> {
    let Some(box_index) = state.checklist.get(item_id).map(|item| item.box_index) else {
        return Vec::new();
    };
    release_box_selection(state, box_index, Some(item_id));

    if state.failed_weight.as_ref().is_some_and(|(id, _)| id != item_id) {
        state.failed_weight = None;
    }
    if state.checklist.transition(item_id, ItemStatus::Pending) {
        tracing::debug!(item = %item_id, box_index, "item pending");
        vec![Effect::ItemPending {
            item_id: item_id.to_string(),
        }]
    } else {
        Vec::new()
    }
}

/// Revert pending or errored items of a box to their rest status
fn release_box_selection(state: &mut VerificationState, box_index: usize, keep: Option<&str>) {
    let selected: Vec<(String, ItemStatus)> = state
        .checklist
        .items()
        .iter()
        .filter(|item| item.box_index == box_index && Some(item.id.as_str()) != keep)
        .filter(|item| matches!(item.status, ItemStatus::Pending | ItemStatus::Error))
        .map(|item| (item.id.clone(), item.rest_status()))
        .collect();
    for (id, rest) in selected {
        state.checklist.transition(&id, rest);
        if state.failed_weight.as_ref().is_some_and(|(failed, _)| *failed == id) {
            state.failed_weight = None;
        }
    }
}

fn weigh(state: &VerificationState, reading: &ScaleReading, policy: &WeightTolerancePolicy) -> Transition {
    if state.weighing_paused || !reading.is_stable || !reading.weight.is_finite() {
        return Transition::unchanged(state);
    }
    if state.last_evaluated.as_ref() == Some(reading) {
        return Transition::unchanged(state);
    }
    let Some(item) = state.checklist.pending_in_box(state.active_box) else {
        return Transition::unchanged(state);
    };
    if let Some((failed_id, failed_weight)) = &state.failed_weight {
        if *failed_id == item.id && (reading.weight - failed_weight).abs() < SAME_WEIGHT_KG {
            return Transition::unchanged(state);
        }
    }
    // Nothing was added since the last verified item
    if let Some(baseline) = state.baseline_weight {
        if item.expected_weight > SAME_WEIGHT_KG && (reading.weight - baseline).abs() < SAME_WEIGHT_KG {
            return Transition::unchanged(state);
        }
    }

    let expected = match item.kind {
        ItemKind::Box => item.expected_weight,
        ItemKind::Product => state.checklist.settled_weight(item.box_index) + item.expected_weight,
    };
    let tolerance = calculate_tolerance(item.expected_weight, item.quantity, policy);
    let item_id = item.id.clone();

    let mut next = state.clone();
    next.last_evaluated = Some(*reading);
    let mut effects = Vec::new();

    if is_within_tolerance(reading.weight, expected, tolerance) {
        next.checklist.transition(&item_id, ItemStatus::Success);
        next.failed_weight = None;
        next.baseline_weight = Some(reading.weight);
        tracing::debug!(item = %item_id, actual = reading.weight, expected, tolerance, "weight verified");
        effects.push(Effect::Verified {
            item_id: item_id.clone(),
            actual: reading.weight,
            expected,
            tolerance,
        });
        effects.push(Effect::ScheduleSettle {
            item_id,
            kind: SettleKind::Success,
        });
        if next.checklist.is_complete() {
            next.weighing_paused = true;
            effects.push(Effect::OrderComplete);
        }
    } else {
        next.checklist.transition(&item_id, ItemStatus::Error);
        next.failed_weight = Some((item_id.clone(), reading.weight));
        tracing::debug!(item = %item_id, actual = reading.weight, expected, tolerance, "weight mismatch");
        effects.push(Effect::WeightMismatch {
            item_id: item_id.clone(),
            actual: reading.weight,
            expected,
            tolerance,
        });
        effects.push(Effect::ScheduleSettle {
            item_id,
            kind: SettleKind::Error,
        });
    }

    Transition { state: next, effects }
}

fn settle(state: &VerificationState, item_id: &str) -> Transition {
    let Some(item) = state.checklist.get(item_id) else {
        return Transition::unchanged(state);
    };
    let (kind, box_index) = (item.kind, item.box_index);

    match item.status {
        ItemStatus::Error => {
            let mut next = state.clone();
            next.checklist.transition(item_id, ItemStatus::Pending);
            // Let the next reading through even if it repeats the last one
            next.last_evaluated = None;
            let effects = vec![Effect::ItemPending {
                item_id: item_id.to_string(),
            }];
            Transition { state: next, effects }
        }
        ItemStatus::Success => {
            let mut next = state.clone();
            let mut effects = Vec::new();
            match kind {
                ItemKind::Product => {
                    next.checklist.transition(item_id, ItemStatus::Done);
                }
                ItemKind::Box => {
                    next.checklist.transition(item_id, ItemStatus::Confirmed);
                }
            }
            complete_box_if_done(&mut next, box_index, &mut effects);
            advance(&mut next, &mut effects);
            Transition { state: next, effects }
        }
        // Reverted or already handled
        _ => Transition::unchanged(state),
    }
}

/// Mark a confirmed box done once all of its products are done
fn complete_box_if_done(state: &mut VerificationState, box_index: usize, effects: &mut Vec<Effect>) {
    let Some(box_item) = state.checklist.box_item(box_index) else {
        return;
    };
    if box_item.status != ItemStatus::Confirmed || !state.checklist.box_products_done(box_index) {
        return;
    }
    let id = box_item.id.clone();
    if state.checklist.transition(&id, ItemStatus::Done) {
        effects.push(Effect::BoxCompleted { box_index });
    }
}

/// Pick the next item to verify in the active box, or finish the order
fn advance(state: &mut VerificationState, effects: &mut Vec<Effect>) {
    if state.checklist.is_complete() {
        if !state.weighing_paused {
            state.weighing_paused = true;
            effects.push(Effect::OrderComplete);
        }
        return;
    }
    if state.weighing_paused || state.checklist.pending_in_box(state.active_box).is_some() {
        return;
    }

    let active = state.active_box;
    let next_id = match state.checklist.box_item(active) {
        Some(box_item) if box_item.status == ItemStatus::AwaitingConfirmation => Some(box_item.id.clone()),
        _ if state.checklist.is_box_confirmed(active) => {
            state.checklist.first_eligible(active).map(|item| item.id.clone())
        }
        _ => None,
    };
    if let Some(id) = next_id {
        effects.extend(make_pending(state, &id));
    }
}

fn confirm_box(state: &VerificationState, box_index: usize) -> Transition {
    let Some(box_item) = state.checklist.box_item(box_index) else {
        return Transition::rejected(state, Rejection::NoSuchBox { box_index });
    };
    if box_item.is_confirmed_box() {
        return Transition::unchanged(state);
    }

    let id = box_item.id.clone();
    let mut next = state.clone();
    let mut effects = Vec::new();
    if box_item.status == ItemStatus::Success {
        next.checklist.transition(&id, ItemStatus::Confirmed);
    } else {
        release_box_selection(&mut next, box_index, Some(&id));
        next.checklist.transition(&id, ItemStatus::Confirmed);
    }
    tracing::debug!(box_index, "box confirmed by operator");

    complete_box_if_done(&mut next, box_index, &mut effects);
    if box_index == next.active_box {
        advance(&mut next, &mut effects);
    }
    Transition { state: next, effects }
}

fn set_active_box(state: &VerificationState, box_index: usize) -> Transition {
    let box_exists = state.checklist.box_item(box_index).is_some()
        || (state.checklist.box_count() == 0 && box_index == 0);
    if !box_exists {
        return Transition::rejected(state, Rejection::NoSuchBox { box_index });
    }

    let mut next = state.clone();
    if box_index != state.active_box {
        release_box_selection(&mut next, state.active_box, None);
        next.active_box = box_index;
        next.last_evaluated = None;
        tracing::debug!(from = state.active_box, to = box_index, "active box changed");
    }
    let mut effects = Vec::new();
    advance(&mut next, &mut effects);
    Transition { state: next, effects }
}
