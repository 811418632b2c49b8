//! Text reports for packing plans and checklists

use crate::model::{Checklist, ItemKind};
use crate::service::packing_planner::PackingPlan;

pub fn generate_plan_report(order_id: &str, plan: &PackingPlan) -> String {
    let mut report = String::new();
    report.push_str("==================================================\n");
    report.push_str("                 Packing Plan Report              \n");
    report.push_str("==================================================\n\n");
    report.push_str("[Summary]\n");
    report.push_str(&format!("  Order:               {}\n", order_id));
    report.push_str(&format!("  Packing mode:        {}\n", plan.mode));
    report.push_str(&format!("  Boxes:               {}\n", plan.boxes.len()));
    report.push_str(&format!("  Total portions:      {}\n", plan.total_portions));
    report.push_str(&format!("  Allocated portions:  {}\n", plan.allocated_portions()));
    report.push_str(&format!("  Unallocated:         {}\n", plan.unallocated_portions));
    report.push('\n');

    report.push_str("[Boxes]\n");
    report.push_str("-".repeat(70).as_str());
    report.push('\n');
    report.push_str(&format!(
        "{:<5} {:<14} {:>9} {:>10} {:>10} {:>12}\n",
        "#", "Box", "Capacity", "Portions", "Range", "Expected"
    ));
    report.push_str("-".repeat(70).as_str());
    report.push('\n');
    for assignment in &plan.boxes {
        let capacity = if assignment.settings.is_unlimited() {
            "-".to_string()
        } else {
            assignment.settings.capacity.to_string()
        };
        report.push_str(&format!(
            "{:<5} {:<14} {:>9} {:>10} {:>10} {:>10.3}kg\n",
            assignment.box_index + 1,
            truncate_str(&assignment.settings.name, 13),
            capacity,
            assignment.portions_per_box,
            format!(
                "{}-{}",
                assignment.portions_range.start, assignment.portions_range.end
            ),
            assignment.expected_weight
        ));
        for portion in &assignment.contents {
            report.push_str(&format!(
                "      - {:<30} x{:<4} {:>8.3}kg\n",
                truncate_str(&portion.name, 29),
                portion.portions,
                portion.expected_weight
            ));
        }
    }
    report.push('\n');

    if plan.has_overflow() {
        report.push_str("[Unallocated Items]\n");
        report.push_str("  Selected boxes are too small. Add boxes before marking the order ready.\n");
        for item in &plan.unallocated_items {
            report.push_str(&format!(
                "  {:<16} {:<30} x{}\n",
                truncate_str(&item.sku, 15),
                truncate_str(&item.name, 29),
                item.quantity
            ));
        }
        report.push('\n');
    }

    report.push_str("==================================================\n");
    report
}

pub fn generate_checklist_report(checklist: &Checklist) -> String {
    let mut report = String::new();
    let (done, total) = checklist.portions_progress();
    report.push_str(&format!("Checklist ({}/{} portions verified)\n", done, total));
    report.push_str("-".repeat(70).as_str());
    report.push('\n');
    report.push_str(&format!(
        "{:<4} {:<7} {:<28} {:>4} {:>10} {:<12}\n",
        "Box", "Kind", "Name", "Qty", "Expected", "Status"
    ));
    report.push_str("-".repeat(70).as_str());
    report.push('\n');
    for item in checklist.items() {
        let kind = match item.kind {
            ItemKind::Box => "box",
            ItemKind::Product => "product",
        };
        report.push_str(&format!(
            "{:<4} {:<7} {:<28} {:>4} {:>8.3}kg {:<12}\n",
            item.box_index + 1,
            kind,
            truncate_str(&item.name, 27),
            item.quantity,
            item.expected_weight,
            item.status.label()
        ));
    }
    report
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(2)).collect();
        format!("{}..", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoxSettings, PortionItem};
    use crate::service::checklist_builder::combine;
    use crate::service::packing_planner::plan_boxes;
    use packcheck_types::PackingMode;

    #[test]
    fn test_plan_report_lists_overflow() {
        let items = vec![
            PortionItem::new("a", "Apple pie", 10, 0.1),
            PortionItem::new("b", "Borscht", 10, 0.1),
            PortionItem::new("c", "Cheesecake", 5, 0.1),
        ];
        let boxes = vec![BoxSettings::new("L", 10, 0.3), BoxSettings::new("L", 10, 0.3)];
        let plan = plan_boxes(&items, &boxes, PackingMode::Economical);
        let report = generate_plan_report("SO-1", &plan);
        assert!(report.contains("Packing Plan Report"));
        assert!(report.contains("Unallocated Items"));
        assert!(report.contains("Cheesecake"));
    }

    #[test]
    fn test_plan_report_without_overflow() {
        let items = vec![PortionItem::new("a", "Apple pie", 2, 0.1)];
        let plan = plan_boxes(&items, &[BoxSettings::new("S", 4, 0.2)], PackingMode::Economical);
        let report = generate_plan_report("SO-2", &plan);
        assert!(!report.contains("Unallocated Items"));
    }

    #[test]
    fn test_checklist_report_shows_statuses() {
        let items = vec![PortionItem::new("a", "Apple pie", 2, 0.1)];
        let plan = plan_boxes(&items, &[BoxSettings::new("S", 4, 0.2)], PackingMode::Economical);
        let report = generate_checklist_report(&combine(&plan.boxes, &items, false));
        assert!(report.contains("awaiting_confirmation"));
        assert!(report.contains("0/2 portions"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate_str("abcdefghij", 6), "abcd..");
        assert_eq!(truncate_str("abc", 6), "abc");
    }
}
