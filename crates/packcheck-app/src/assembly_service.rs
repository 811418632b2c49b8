//! Order preparation - catalog lookup, box selection, packing plan, checklist
//!
//! This service turns a raw order into everything a session needs:
//! 1. Resolve unit weights and barcodes from the catalog
//! 2. Use the given boxes, or pick box types for the order size
//! 3. Plan portions into boxes
//! 4. Build the checklist

use packcheck_domain::model::{BoxSettings, Checklist, Order, PortionItem};
use packcheck_domain::repository::{CatalogProvider, OrderProvider};
use packcheck_domain::service::{combine, plan_boxes, select_boxes, PackingPlan};
use packcheck_types::{PackingMode, Result};
use serde::Serialize;

/// An order ready to be assembled
#[derive(Debug, Clone, Serialize)]
pub struct PreparedOrder {
    pub order: Order,
    pub items: Vec<PortionItem>,
    pub plan: PackingPlan,
    pub checklist: Checklist,
    /// False when expected weights could not be resolved
    pub weighing_enabled: bool,
    /// Data problems found while preparing
    pub issues: Vec<String>,
}

impl PreparedOrder {
    pub fn order_id(&self) -> &str {
        &self.order.id
    }

    pub fn is_pre_completed(&self) -> bool {
        self.order.status.is_ready()
    }
}

/// Look up weight and barcode of every order line
///
/// Lines the catalog cannot weigh keep a zero unit weight and are reported
/// as issues; the checklist still lists them.
pub fn resolve_items(order: &Order, catalog: &dyn CatalogProvider) -> (Vec<PortionItem>, Vec<String>) {
    let mut items = Vec::with_capacity(order.items.len());
    let mut issues = Vec::new();
    for line in &order.items {
        let unit_weight = match catalog.unit_weight(&line.sku) {
            Ok(weight) => weight,
            Err(e) => {
                tracing::warn!(order = %order.id, sku = %line.sku, "cannot weigh item: {}", e);
                issues.push(format!("{} ({}): {}", line.name, line.sku, e));
                0.0
            }
        };
        let mut item = PortionItem::new(line.sku.clone(), line.name.clone(), line.quantity, unit_weight);
        item.barcode = catalog.barcode(&line.sku);
        items.push(item);
    }
    (items, issues)
}

/// Prepare `order` for assembly
///
/// `boxes` is the operator's explicit box set; `None` selects box types from
/// the catalog for the order's portion count.
pub fn prepare_order(
    order: Order,
    catalog: &dyn CatalogProvider,
    boxes: Option<&[BoxSettings]>,
    mode: PackingMode,
) -> PreparedOrder {
    let (items, mut issues) = resolve_items(&order, catalog);
    let weighing_enabled = issues.is_empty();

    let boxes: Vec<BoxSettings> = match boxes {
        Some(explicit) => explicit.to_vec(),
        None => match catalog.box_types() {
            Ok(types) => select_boxes(order.total_portions(), &types, mode),
            Err(e) => {
                tracing::warn!(order = %order.id, "box types unavailable: {}", e);
                issues.push(format!("box types unavailable: {}", e));
                Vec::new()
            }
        },
    };

    let plan = plan_boxes(&items, &boxes, mode);
    if plan.has_overflow() {
        tracing::warn!(
            order = %order.id,
            unallocated = plan.unallocated_portions,
            "selected boxes cannot hold the order"
        );
    }
    let checklist = combine(&plan.boxes, &items, order.status.is_ready());
    tracing::debug!(
        order = %order.id,
        boxes = plan.boxes.len(),
        rows = checklist.len(),
        "order prepared"
    );

    PreparedOrder {
        order,
        items,
        plan,
        checklist,
        weighing_enabled,
        issues,
    }
}

/// Fetch an order from `provider` and prepare it
pub fn load_and_prepare(
    provider: &dyn OrderProvider,
    order_id: &str,
    catalog: &dyn CatalogProvider,
    boxes: Option<&[BoxSettings]>,
    mode: PackingMode,
) -> Result<PreparedOrder> {
    let order = provider.load_order(order_id)?;
    Ok(prepare_order(order, catalog, boxes, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcheck_domain::model::{OrderLine, OrderStatus};
    use packcheck_infra::CsvCatalog;

    const CATALOG: &str = "\
sku,name,unit_weight_kg,barcode
soup,Miso soup,0.33,4901234567894
rice,Rice bowl,0.2,
";

    fn catalog() -> CsvCatalog {
        CsvCatalog::from_csv_str(CATALOG).unwrap().with_boxes(vec![
            BoxSettings::new("S", 4, 0.2),
            BoxSettings::new("M", 8, 0.35),
        ])
    }

    fn order(status: OrderStatus, lines: &[(&str, u32)]) -> Order {
        Order {
            id: "SO-1".to_string(),
            status,
            items: lines
                .iter()
                .map(|(sku, quantity)| OrderLine {
                    sku: sku.to_string(),
                    name: sku.to_uppercase(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_prepare_selects_boxes_and_resolves_barcodes() {
        let prepared = prepare_order(
            order(OrderStatus::New, &[("soup", 2), ("rice", 1)]),
            &catalog(),
            None,
            PackingMode::Economical,
        );
        assert!(prepared.weighing_enabled);
        assert_eq!(prepared.plan.boxes.len(), 1);
        assert_eq!(prepared.plan.boxes[0].settings.name, "S");
        assert_eq!(prepared.items[0].barcode.as_deref(), Some("4901234567894"));
        assert!(!prepared.checklist.is_complete());
    }

    #[test]
    fn test_unknown_sku_disables_weighing_but_keeps_row() {
        let prepared = prepare_order(
            order(OrderStatus::New, &[("soup", 1), ("mystery", 1)]),
            &catalog(),
            None,
            PackingMode::Economical,
        );
        assert!(!prepared.weighing_enabled);
        assert_eq!(prepared.issues.len(), 1);
        assert_eq!(prepared.checklist.products().count(), 2);
    }

    #[test]
    fn test_ready_order_is_pre_completed() {
        let prepared = prepare_order(
            order(OrderStatus::ReadyToShip, &[("soup", 2)]),
            &catalog(),
            None,
            PackingMode::Economical,
        );
        assert!(prepared.is_pre_completed());
        assert!(prepared.checklist.is_complete());
    }

    #[test]
    fn test_explicit_boxes_can_overflow() {
        let boxes = vec![BoxSettings::new("XS", 1, 0.1)];
        let prepared = prepare_order(
            order(OrderStatus::New, &[("soup", 3)]),
            &catalog(),
            Some(&boxes),
            PackingMode::Economical,
        );
        assert!(prepared.plan.has_overflow());
        assert_eq!(prepared.plan.unallocated_portions, 2);
    }
}
