//! Box packing planner
//!
//! Distributes order portions over an ordered list of boxes with a
//! deterministic greedy fill. Items are kept whole while they fit; an item
//! larger than an empty box is split portion-wise across boxes. When keeping
//! items whole would strand free room, portions are split at box boundaries
//! instead, so only demand beyond the selected capacity is reported as
//! unallocated, never dropped.

use packcheck_types::PackingMode;
use serde::{Deserialize, Serialize};

use crate::model::{BoxSettings, PortionItem};

/// Half-open range over the flattened portion sequence of the order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortionsRange {
    pub start: u32,
    pub end: u32,
}

impl PortionsRange {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Portions of one order line placed into one box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPortion {
    /// Index of the order line in the planner input
    pub item_index: usize,
    pub sku: String,
    pub name: String,
    pub portions: u32,
    pub expected_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxAssignment {
    pub box_index: usize,
    pub settings: BoxSettings,
    pub portions_range: PortionsRange,
    pub portions_per_box: u32,
    pub contents: Vec<PlannedPortion>,
    /// Own weight plus every assigned portion, in kg
    pub expected_weight: f64,
}

impl BoxAssignment {
    fn open(box_index: usize, settings: BoxSettings, start: u32) -> Self {
        let own_weight = settings.own_weight();
        Self {
            box_index,
            settings,
            portions_range: PortionsRange { start, end: start },
            portions_per_box: 0,
            contents: Vec::new(),
            expected_weight: own_weight,
        }
    }

    fn place(&mut self, item_index: usize, item: &PortionItem, portions: u32) {
        let weight = item.weight_of(portions);
        self.portions_per_box += portions;
        self.portions_range.end += portions;
        self.expected_weight += weight;
        match self.contents.last_mut() {
            Some(last) if last.item_index == item_index => {
                last.portions += portions;
                last.expected_weight += weight;
            }
            _ => self.contents.push(PlannedPortion {
                item_index,
                sku: item.sku.clone(),
                name: item.name.clone(),
                portions,
                expected_weight: weight,
            }),
        }
    }

    /// Portions still free under the declared capacity
    pub fn remaining(&self) -> Option<u32> {
        if self.settings.is_unlimited() {
            None
        } else {
            Some(self.settings.capacity.saturating_sub(self.portions_per_box))
        }
    }
}

/// Order line portions that no selected box could take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnallocatedItem {
    pub item_index: usize,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
}

impl UnallocatedItem {
    fn new(item_index: usize, item: &PortionItem, quantity: u32) -> Self {
        Self {
            item_index,
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingPlan {
    pub mode: PackingMode,
    pub boxes: Vec<BoxAssignment>,
    pub total_portions: u32,
    pub unallocated_portions: u32,
    pub unallocated_items: Vec<UnallocatedItem>,
}

impl PackingPlan {
    pub fn has_overflow(&self) -> bool {
        self.unallocated_portions > 0
    }

    pub fn allocated_portions(&self) -> u32 {
        self.boxes.iter().map(|b| b.portions_per_box).sum()
    }

    /// `name × quantity` for every unallocated item
    pub fn overflow_labels(&self) -> Vec<String> {
        self.unallocated_items
            .iter()
            .map(|item| format!("{} × {}", item.name, item.quantity))
            .collect()
    }
}

/// Plan portions of `items` into `boxes`, in order
pub fn plan_boxes(items: &[PortionItem], boxes: &[BoxSettings], mode: PackingMode) -> PackingPlan {
    let total_portions: u32 = items.iter().map(|item| item.quantity).sum();

    // No boxes, or one box without a limit: everything goes to box 0
    let unlimited = boxes.is_empty() || (boxes.len() == 1 && boxes[0].is_unlimited());
    if unlimited {
        let settings = boxes
            .first()
            .cloned()
            .unwrap_or_else(|| BoxSettings::new("default", 0, 0.0));
        let mut assignment = BoxAssignment::open(0, settings, 0);
        for (index, item) in items.iter().enumerate() {
            if item.quantity > 0 {
                assignment.place(index, item, item.quantity);
            }
        }
        return PackingPlan {
            mode,
            boxes: vec![assignment],
            total_portions,
            unallocated_portions: 0,
            unallocated_items: Vec::new(),
        };
    }

    let shares = box_shares(boxes, total_portions, mode);
    let targets = greedy_targets(boxes, &shares, mode);
    let (mut assignments, mut unallocated_items) = greedy_fill(items, boxes, &targets);

    // Whole-item placement can strand free room; only demand beyond the
    // selected capacity may stay unallocated
    let overflow = total_portions.saturating_sub(capacity_limit(boxes));
    if total_portions - allocated_in(&assignments) > overflow {
        tracing::debug!(
            total = total_portions,
            overflow,
            "greedy fill left room unused, splitting portions across boxes"
        );
        (assignments, unallocated_items) = split_fill(items, boxes, &shares);
    }

    let allocated = allocated_in(&assignments);
    PackingPlan {
        mode,
        boxes: assignments,
        total_portions,
        unallocated_portions: total_portions.saturating_sub(allocated),
        unallocated_items,
    }
}

fn allocated_in(assignments: &[BoxAssignment]) -> u32 {
    assignments.iter().map(|b| b.portions_per_box).sum()
}

fn capacity_of(settings: &BoxSettings) -> u64 {
    if settings.is_unlimited() {
        u64::from(u32::MAX)
    } else {
        u64::from(settings.capacity)
    }
}

/// Total portions the boxes can hold, saturating at `u32::MAX`
fn capacity_limit(boxes: &[BoxSettings]) -> u32 {
    let total: u64 = boxes.iter().map(capacity_of).sum();
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Portions each box receives when portions may be split freely
///
/// Economical fills boxes to capacity in order. Spacious gives every box but
/// the last an even share, raised whenever the boxes after it could not
/// absorb the rest. The shares sum to `min(total, capacity)`.
fn box_shares(boxes: &[BoxSettings], total: u32, mode: PackingMode) -> Vec<u32> {
    let last = boxes.len() - 1;
    let even_share = u64::from(total.div_ceil(boxes.len() as u32).max(1));
    let mut later: u64 = boxes.iter().map(capacity_of).sum();
    let mut remaining = total;
    boxes
        .iter()
        .enumerate()
        .map(|(index, settings)| {
            let capacity = capacity_of(settings);
            later -= capacity;
            let wanted = match mode {
                PackingMode::Spacious if index != last => {
                    capacity.min(even_share.max(u64::from(remaining).saturating_sub(later)))
                }
                _ => capacity,
            };
            let share = wanted.min(u64::from(remaining)) as u32;
            remaining -= share;
            share
        })
        .collect()
}

/// Per-box fill target for whole-item placement. `None` means unlimited.
fn greedy_targets(boxes: &[BoxSettings], shares: &[u32], mode: PackingMode) -> Vec<Option<u32>> {
    let last = boxes.len() - 1;
    boxes
        .iter()
        .zip(shares)
        .enumerate()
        .map(|(index, (settings, &share))| match mode {
            PackingMode::Spacious if index != last => Some(share),
            _ if settings.is_unlimited() => None,
            _ => Some(settings.capacity),
        })
        .collect()
}

/// Keep items whole while they fit; an item opens the next box when it does
/// not fit a non-empty one, and is split when larger than an empty box
fn greedy_fill(
    items: &[PortionItem],
    boxes: &[BoxSettings],
    targets: &[Option<u32>],
) -> (Vec<BoxAssignment>, Vec<UnallocatedItem>) {
    let mut assignments: Vec<BoxAssignment> = Vec::with_capacity(boxes.len());
    let mut current = BoxAssignment::open(0, boxes[0].clone(), 0);
    let mut unallocated_items = Vec::new();
    let mut cursor = 0u32;

    'items: for (index, item) in items.iter().enumerate() {
        let mut left = item.quantity;
        while left > 0 {
            let room = room_in(&current, targets[current.box_index]);
            if left <= room {
                current.place(index, item, left);
                cursor += left;
                continue 'items;
            }
            let next = current.box_index + 1;
            let is_last = next >= boxes.len();
            // Split when the item is larger than an empty box, or when the
            // final box can take part of it
            if (current.portions_per_box == 0 || is_last) && room > 0 {
                current.place(index, item, room);
                cursor += room;
                left -= room;
            }
            if is_last {
                unallocated_items.push(UnallocatedItem::new(index, item, left));
                continue 'items;
            }
            assignments.push(current);
            current = BoxAssignment::open(next, boxes[next].clone(), cursor);
        }
    }
    finish(assignments, current, boxes, cursor, unallocated_items)
}

/// Pour portions into boxes in order, splitting items at every box boundary
fn split_fill(
    items: &[PortionItem],
    boxes: &[BoxSettings],
    shares: &[u32],
) -> (Vec<BoxAssignment>, Vec<UnallocatedItem>) {
    let mut assignments: Vec<BoxAssignment> = Vec::with_capacity(boxes.len());
    let mut current = BoxAssignment::open(0, boxes[0].clone(), 0);
    let mut unallocated_items = Vec::new();
    let mut cursor = 0u32;

    for (index, item) in items.iter().enumerate() {
        let mut left = item.quantity;
        while left > 0 {
            let room = shares[current.box_index].saturating_sub(current.portions_per_box);
            if room > 0 {
                let placed = left.min(room);
                current.place(index, item, placed);
                cursor += placed;
                left -= placed;
                continue;
            }
            let next = current.box_index + 1;
            if next >= boxes.len() {
                unallocated_items.push(UnallocatedItem::new(index, item, left));
                break;
            }
            assignments.push(current);
            current = BoxAssignment::open(next, boxes[next].clone(), cursor);
        }
    }
    finish(assignments, current, boxes, cursor, unallocated_items)
}

fn finish(
    mut assignments: Vec<BoxAssignment>,
    current: BoxAssignment,
    boxes: &[BoxSettings],
    cursor: u32,
    unallocated_items: Vec<UnallocatedItem>,
) -> (Vec<BoxAssignment>, Vec<UnallocatedItem>) {
    assignments.push(current);
    // Boxes never reached stay in the plan, empty
    while assignments.len() < boxes.len() {
        let index = assignments.len();
        assignments.push(BoxAssignment::open(index, boxes[index].clone(), cursor));
    }
    for unallocated in &unallocated_items {
        tracing::debug!(sku = %unallocated.sku, portions = unallocated.quantity, "no box left for portions");
    }
    (assignments, unallocated_items)
}

/// Free portions in the box, limited by the fill target
fn room_in(assignment: &BoxAssignment, target: Option<u32>) -> u32 {
    match target {
        None => u32::MAX,
        Some(target) => target.saturating_sub(assignment.portions_per_box),
    }
}

/// Choose boxes for `total_portions` from `box_types` (ascending capacity)
///
/// Economical picks the smallest type that holds everything, otherwise fills
/// with the largest type and repeats for the rest. Spacious does the same
/// but steps one size up whenever a larger type exists.
pub fn select_boxes(total_portions: u32, box_types: &[BoxSettings], mode: PackingMode) -> Vec<BoxSettings> {
    let mut types: Vec<&BoxSettings> = box_types.iter().filter(|b| !b.is_unlimited()).collect();
    types.sort_by_key(|b| b.capacity);

    if types.is_empty() {
        return box_types.iter().take(1).cloned().collect();
    }
    if total_portions == 0 {
        return vec![types[0].clone()];
    }

    let largest = types[types.len() - 1];
    let mut selected = Vec::new();
    let mut left = total_portions;
    while left > 0 {
        let fit = types.iter().position(|b| b.capacity >= left);
        let chosen = match (fit, mode) {
            (Some(i), PackingMode::Economical) => types[i],
            (Some(i), PackingMode::Spacious) => types[(i + 1).min(types.len() - 1)],
            (None, _) => largest,
        };
        selected.push(chosen.clone());
        left = left.saturating_sub(chosen.capacity);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(sku: &str, quantity: u32, unit_weight: f64) -> PortionItem {
        PortionItem::new(sku, sku.to_uppercase(), quantity, unit_weight)
    }

    fn boxes(capacities: &[u32]) -> Vec<BoxSettings> {
        capacities
            .iter()
            .map(|&c| BoxSettings::new(format!("B{}", c), c, 0.2))
            .collect()
    }

    fn assert_capacity_respected(plan: &PackingPlan) {
        for assignment in &plan.boxes {
            if !assignment.settings.is_unlimited() {
                assert!(
                    assignment.portions_per_box <= assignment.settings.capacity,
                    "box {} holds {} > capacity {}",
                    assignment.box_index,
                    assignment.portions_per_box,
                    assignment.settings.capacity
                );
            }
        }
        assert_eq!(
            plan.unallocated_portions,
            plan.total_portions - plan.allocated_portions()
        );
        let capacity: u32 = plan.boxes.iter().map(|b| b.settings.capacity).sum();
        assert_eq!(
            plan.unallocated_portions,
            plan.total_portions.saturating_sub(capacity),
            "unallocated portions while boxes still have room"
        );
        let listed: u32 = plan.unallocated_items.iter().map(|u| u.quantity).sum();
        assert_eq!(listed, plan.unallocated_portions);
        let mut start = 0;
        for assignment in &plan.boxes {
            assert_eq!(assignment.portions_range.start, start);
            assert_eq!(assignment.portions_range.len(), assignment.portions_per_box);
            start = assignment.portions_range.end;
        }
    }

    #[test]
    fn test_single_item_single_box() {
        let plan = plan_boxes(&[item("a", 2, 0.33)], &boxes(&[4]), PackingMode::Economical);
        assert_eq!(plan.boxes.len(), 1);
        assert_eq!(plan.boxes[0].portions_per_box, 2);
        assert!((plan.boxes[0].expected_weight - 0.86).abs() < 1e-9);
        assert!(!plan.has_overflow());
    }

    #[test]
    fn test_overflow_reports_names() {
        // 2 boxes x 10, 25 portions demanded
        let items = [item("a", 10, 0.1), item("b", 10, 0.1), item("c", 5, 0.1)];
        let plan = plan_boxes(&items, &boxes(&[10, 10]), PackingMode::Economical);
        assert_eq!(plan.unallocated_portions, 5);
        assert_eq!(
            plan.unallocated_items,
            vec![UnallocatedItem {
                item_index: 2,
                sku: "c".to_string(),
                name: "C".to_string(),
                quantity: 5,
            }]
        );
        assert_eq!(plan.overflow_labels(), vec!["C × 5".to_string()]);
        assert_capacity_respected(&plan);
    }

    #[test]
    fn test_large_item_is_split_across_boxes() {
        let plan = plan_boxes(&[item("a", 25, 0.1)], &boxes(&[10, 10]), PackingMode::Economical);
        assert_eq!(plan.boxes[0].portions_per_box, 10);
        assert_eq!(plan.boxes[1].portions_per_box, 10);
        assert_eq!(plan.unallocated_portions, 5);
        assert_eq!(plan.unallocated_items[0].quantity, 5);
        assert_eq!(plan.boxes[1].portions_range, PortionsRange { start: 10, end: 20 });
        assert_capacity_respected(&plan);
    }

    #[test]
    fn test_item_that_does_not_fit_opens_next_box() {
        let items = [item("a", 3, 0.1), item("b", 3, 0.1)];
        let plan = plan_boxes(&items, &boxes(&[4, 4]), PackingMode::Economical);
        assert_eq!(plan.boxes[0].contents.len(), 1);
        assert_eq!(plan.boxes[1].contents[0].sku, "b");
        assert_eq!(plan.boxes[1].portions_range, PortionsRange { start: 3, end: 6 });
        assert_capacity_respected(&plan);
    }

    #[test]
    fn test_expected_weight_includes_own_weight() {
        let items = [item("a", 2, 0.5), item("b", 1, 0.25)];
        let plan = plan_boxes(&items, &boxes(&[10]), PackingMode::Economical);
        assert!((plan.boxes[0].expected_weight - (0.2 + 1.0 + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_no_boxes_places_everything_in_box_zero() {
        let items = [item("a", 40, 0.1), item("b", 3, 0.1)];
        let plan = plan_boxes(&items, &[], PackingMode::Economical);
        assert_eq!(plan.boxes.len(), 1);
        assert_eq!(plan.boxes[0].portions_per_box, 43);
        assert!(!plan.has_overflow());
    }

    #[test]
    fn test_zero_capacity_box_is_unlimited() {
        let plan = plan_boxes(&[item("a", 99, 0.1)], &boxes(&[0]), PackingMode::Spacious);
        assert_eq!(plan.boxes[0].portions_per_box, 99);
        assert_eq!(plan.unallocated_portions, 0);
    }

    #[test]
    fn test_single_limited_box_overflow_is_reported() {
        let plan = plan_boxes(&[item("a", 7, 0.1)], &boxes(&[5]), PackingMode::Economical);
        assert_eq!(plan.boxes[0].portions_per_box, 5);
        assert_eq!(plan.unallocated_portions, 2);
    }

    #[test]
    fn test_spacious_balances_boxes() {
        let items: Vec<PortionItem> = (0..6).map(|i| item(&format!("s{}", i), 1, 0.1)).collect();
        let economical = plan_boxes(&items, &boxes(&[10, 10]), PackingMode::Economical);
        let spacious = plan_boxes(&items, &boxes(&[10, 10]), PackingMode::Spacious);
        assert_eq!(economical.boxes[0].portions_per_box, 6);
        assert_eq!(economical.boxes[1].portions_per_box, 0);
        assert_eq!(spacious.boxes[0].portions_per_box, 3);
        assert_eq!(spacious.boxes[1].portions_per_box, 3);
    }

    #[test]
    fn test_deterministic() {
        let items = [item("a", 4, 0.1), item("b", 7, 0.2), item("c", 2, 0.3)];
        let first = plan_boxes(&items, &boxes(&[6, 6, 6]), PackingMode::Spacious);
        let second = plan_boxes(&items, &boxes(&[6, 6, 6]), PackingMode::Spacious);
        assert_eq!(first, second);
        assert_capacity_respected(&first);
    }

    #[test]
    fn test_capacity_never_exceeded_across_inputs() {
        let box_sets: [&[u32]; 7] = [&[3, 5, 8], &[10, 2], &[8, 3, 6], &[4, 4], &[12, 6], &[1, 7, 2], &[5]];
        for capacities in box_sets {
            for total in 0..30u32 {
                let items: Vec<PortionItem> = (0..total)
                    .map(|i| item(&format!("i{}", i), 1 + i % 4, 0.1))
                    .collect();
                for mode in [PackingMode::Economical, PackingMode::Spacious] {
                    let plan = plan_boxes(&items, &boxes(capacities), mode);
                    assert_capacity_respected(&plan);
                }
            }
        }
    }

    #[test]
    fn test_spacious_small_last_box_takes_only_its_capacity() {
        let plan = plan_boxes(&[item("a", 12, 0.1)], &boxes(&[10, 2]), PackingMode::Spacious);
        assert_eq!(plan.boxes[0].portions_per_box, 10);
        assert_eq!(plan.boxes[1].portions_per_box, 2);
        assert!(!plan.has_overflow());
        assert_capacity_respected(&plan);
    }

    #[test]
    fn test_economical_refills_room_left_by_whole_items() {
        let items = [item("a", 3, 0.1), item("b", 3, 0.1), item("c", 2, 0.1)];
        let plan = plan_boxes(&items, &boxes(&[4, 4]), PackingMode::Economical);
        assert_eq!(plan.boxes[0].portions_per_box, 4);
        assert_eq!(plan.boxes[1].portions_per_box, 4);
        assert!(!plan.has_overflow());
        // b is split at the box boundary
        assert_eq!(plan.boxes[0].contents[1].sku, "b");
        assert_eq!(plan.boxes[0].contents[1].portions, 1);
        assert_eq!(plan.boxes[1].contents[0].portions, 2);
        assert_capacity_respected(&plan);
    }

    #[test]
    fn test_selected_boxes_always_hold_the_order() {
        let box_types = boxes(&[4, 6, 12]);
        for total in 1..40u32 {
            let items: Vec<PortionItem> = (0..total.div_ceil(3))
                .map(|i| item(&format!("i{}", i), (total - i * 3).min(3), 0.1))
                .collect();
            assert_eq!(items.iter().map(|i| i.quantity).sum::<u32>(), total);
            for mode in [PackingMode::Economical, PackingMode::Spacious] {
                let selected = select_boxes(total, &box_types, mode);
                let plan = plan_boxes(&items, &selected, mode);
                assert_eq!(plan.unallocated_portions, 0, "total {} mode {}", total, mode);
                assert_capacity_respected(&plan);
            }
        }
    }

    #[test]
    fn test_spacious_selection_of_fourteen() {
        let selected = select_boxes(14, &boxes(&[4, 6, 12]), PackingMode::Spacious);
        let capacities: Vec<u32> = selected.iter().map(|b| b.capacity).collect();
        assert_eq!(capacities, vec![12, 6]);
        let plan = plan_boxes(&[item("a", 14, 0.1)], &selected, PackingMode::Spacious);
        assert_eq!(plan.boxes[0].portions_per_box, 8);
        assert_eq!(plan.boxes[1].portions_per_box, 6);
        assert!(!plan.has_overflow());
    }

    #[test]
    fn test_select_boxes_economical_picks_smallest_fit() {
        let selected = select_boxes(5, &boxes(&[4, 6, 12]), PackingMode::Economical);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].capacity, 6);
    }

    #[test]
    fn test_select_boxes_spacious_steps_up() {
        let selected = select_boxes(5, &boxes(&[4, 6, 12]), PackingMode::Spacious);
        assert_eq!(selected[0].capacity, 12);
    }

    #[test]
    fn test_select_boxes_uses_multiple_largest() {
        let selected = select_boxes(30, &boxes(&[4, 12]), PackingMode::Economical);
        let capacities: Vec<u32> = selected.iter().map(|b| b.capacity).collect();
        assert_eq!(capacities, vec![12, 12, 12]);
    }
}
