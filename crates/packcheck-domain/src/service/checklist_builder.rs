//! Checklist construction from a packing plan

use crate::model::{Checklist, ChecklistItem, ItemKind, ItemStatus, PortionItem};
use crate::service::packing_planner::BoxAssignment;

pub fn box_item_id(box_index: usize) -> String {
    format!("box-{}", box_index)
}

pub fn product_item_id(item_index: usize, box_index: usize) -> String {
    format!("item-{}-{}", item_index, box_index)
}

/// Build the checklist for a planned order
///
/// Emits one box item per non-empty box followed by its products. For orders
/// already fulfilled upstream every product is `Done` and every box
/// `Confirmed`, so no scan or weigh step remains.
pub fn combine(boxes: &[BoxAssignment], items: &[PortionItem], is_order_pre_completed: bool) -> Checklist {
    let (box_status, product_status) = if is_order_pre_completed {
        (ItemStatus::Confirmed, ItemStatus::Done)
    } else {
        (ItemStatus::AwaitingConfirmation, ItemStatus::Default)
    };

    let mut entries = Vec::new();
    for assignment in boxes {
        // Trailing boxes the planner never reached are left out
        if assignment.box_index > 0 && assignment.portions_per_box == 0 {
            continue;
        }

        entries.push(ChecklistItem {
            id: box_item_id(assignment.box_index),
            name: assignment.settings.name.clone(),
            quantity: 1,
            expected_weight: assignment.settings.own_weight(),
            status: box_status,
            kind: ItemKind::Box,
            box_index: assignment.box_index,
            sku: None,
            barcode: None,
            box_settings: Some(assignment.settings.clone()),
        });

        for portion in &assignment.contents {
            let barcode = items
                .get(portion.item_index)
                .and_then(|item| item.barcode.clone());
            entries.push(ChecklistItem {
                id: product_item_id(portion.item_index, assignment.box_index),
                name: portion.name.clone(),
                quantity: portion.portions,
                expected_weight: portion.expected_weight,
                status: product_status,
                kind: ItemKind::Product,
                box_index: assignment.box_index,
                sku: Some(portion.sku.clone()),
                barcode,
                box_settings: None,
            });
        }
    }

    Checklist::new(entries)
}
