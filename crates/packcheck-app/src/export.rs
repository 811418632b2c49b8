//! Excel pick list export

use std::path::Path;

use packcheck_domain::model::{Checklist, ItemKind};
use packcheck_domain::service::PackingPlan;
use packcheck_types::{Error, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

/// Export the pick list of an order to an Excel file
pub fn export_pick_list(order_id: &str, plan: &PackingPlan, checklist: &Checklist, output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    // Add summary sheet
    let summary_sheet = workbook.add_worksheet();
    write_summary_sheet(summary_sheet, order_id, plan, checklist)?;

    // Add details sheet
    let details_sheet = workbook.add_worksheet();
    write_details_sheet(details_sheet, checklist)?;

    workbook
        .save(output_path)
        .map_err(|e| Error::Excel(e.to_string()))?;

    Ok(())
}

fn write_label(sheet: &mut Worksheet, row: u32, label: &str, value: f64) -> Result<()> {
    sheet
        .write_string(row, 0, label)
        .map_err(|e| Error::Excel(e.to_string()))?;
    sheet
        .write_number(row, 1, value)
        .map_err(|e| Error::Excel(e.to_string()))?;
    Ok(())
}

fn write_summary_sheet(sheet: &mut Worksheet, order_id: &str, plan: &PackingPlan, checklist: &Checklist) -> Result<()> {
    sheet
        .set_name("Summary")
        .map_err(|e| Error::Excel(e.to_string()))?;

    let header_format = Format::new().set_bold();

    sheet
        .write_string_with_format(0, 0, "Pick List", &header_format)
        .map_err(|e| Error::Excel(e.to_string()))?;

    sheet
        .write_string(2, 0, "Order:")
        .map_err(|e| Error::Excel(e.to_string()))?;
    sheet
        .write_string(2, 1, order_id)
        .map_err(|e| Error::Excel(e.to_string()))?;
    sheet
        .write_string(3, 0, "Packing mode:")
        .map_err(|e| Error::Excel(e.to_string()))?;
    sheet
        .write_string(3, 1, plan.mode.to_string())
        .map_err(|e| Error::Excel(e.to_string()))?;

    let (done, total) = checklist.portions_progress();
    write_label(sheet, 4, "Boxes:", plan.boxes.len() as f64)?;
    write_label(sheet, 5, "Total portions:", total as f64)?;
    write_label(sheet, 6, "Verified portions:", done as f64)?;
    write_label(sheet, 7, "Unallocated portions:", plan.unallocated_portions as f64)?;

    // Per-box weights
    sheet
        .write_string_with_format(9, 0, "Boxes", &header_format)
        .map_err(|e| Error::Excel(e.to_string()))?;
    let headers = ["#", "Box", "Capacity", "Portions", "Expected (kg)"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(10, col as u16, *header, &header_format)
            .map_err(|e| Error::Excel(e.to_string()))?;
    }
    let mut row = 11;
    for assignment in &plan.boxes {
        sheet
            .write_number(row, 0, (assignment.box_index + 1) as f64)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 1, &assignment.settings.name)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_number(row, 2, assignment.settings.capacity as f64)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_number(row, 3, assignment.portions_per_box as f64)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_number(row, 4, assignment.expected_weight)
            .map_err(|e| Error::Excel(e.to_string()))?;
        row += 1;
    }

    if plan.has_overflow() {
        row += 1;
        sheet
            .write_string_with_format(row, 0, "Unallocated", &header_format)
            .map_err(|e| Error::Excel(e.to_string()))?;
        for label in plan.overflow_labels() {
            row += 1;
            sheet
                .write_string(row, 0, &label)
                .map_err(|e| Error::Excel(e.to_string()))?;
        }
    }

    Ok(())
}

fn write_details_sheet(sheet: &mut Worksheet, checklist: &Checklist) -> Result<()> {
    sheet
        .set_name("Details")
        .map_err(|e| Error::Excel(e.to_string()))?;

    let header_format = Format::new().set_bold();

    let headers = [
        "Box",
        "Kind",
        "Name",
        "SKU",
        "Barcode",
        "Qty",
        "Expected (kg)",
        "Status",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(|e| Error::Excel(e.to_string()))?;
    }

    for (row_idx, item) in checklist.items().iter().enumerate() {
        let row = (row_idx + 1) as u32;
        let kind = match item.kind {
            ItemKind::Box => "box",
            ItemKind::Product => "product",
        };

        sheet
            .write_number(row, 0, (item.box_index + 1) as f64)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 1, kind)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 2, &item.name)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 3, item.sku.as_deref().unwrap_or("-"))
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 4, item.barcode.as_deref().unwrap_or("-"))
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_number(row, 5, item.quantity as f64)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_number(row, 6, item.expected_weight)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .write_string(row, 7, item.status.label())
            .map_err(|e| Error::Excel(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcheck_domain::model::{BoxSettings, PortionItem};
    use packcheck_domain::service::{combine, plan_boxes};
    use packcheck_types::PackingMode;

    #[test]
    fn test_export_writes_workbook() {
        let items = vec![
            PortionItem::new("a", "Apple pie", 3, 0.1),
            PortionItem::new("b", "Borscht", 4, 0.3),
        ];
        let boxes = vec![BoxSettings::new("S", 4, 0.2)];
        let plan = plan_boxes(&items, &boxes, PackingMode::Economical);
        let checklist = combine(&plan.boxes, &items, false);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pick.xlsx");
        export_pick_list("SO-1", &plan, &checklist, &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
