//! Scripted simulation runs end to end

use chrono::{TimeZone, Utc};

use packcheck_app::simulation::{run_script, DEFAULT_STEP_MS};
use packcheck_app::{prepare_order, AssemblySession, Config};
use packcheck_domain::model::{BoxSettings, ItemStatus, Order, OrderLine, OrderStatus, WeightTolerancePolicy};
use packcheck_infra::{CsvCatalog, MemorySink, ScriptedScale, SimulationScript};
use packcheck_types::PackingMode;

const CATALOG: &str = "\
sku,name,unit_weight_kg,barcode
soup,Miso soup,0.33,4901234567894
rice,Rice bowl,0.25,4901234567900
";

fn order(lines: &[(&str, u32)]) -> Order {
    Order {
        id: "SO-SIM".to_string(),
        status: OrderStatus::New,
        items: lines
            .iter()
            .map(|(sku, quantity)| OrderLine {
                sku: sku.to_string(),
                name: sku.to_string(),
                quantity: *quantity,
            })
            .collect(),
    }
}

fn run(lines: &[(&str, u32)], script: &str) -> (packcheck_app::simulation::SimulationReport, MemorySink) {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
    let catalog = CsvCatalog::from_csv_str(CATALOG).unwrap();
    let prepared = prepare_order(
        order(lines),
        &catalog,
        Some(&[BoxSettings::new("S", 6, 0.2)]),
        PackingMode::Economical,
    );
    let mut session = AssemblySession::new(
        ScriptedScale::new(start),
        MemorySink::new(),
        Config::default(),
        WeightTolerancePolicy::combined(0.0, 20.0),
    );
    session.load_order(prepared, start);
    let script = SimulationScript::from_json_str(script).unwrap();
    let report = run_script(&mut session, &script, start, DEFAULT_STEP_MS);
    (report, session.sink().clone())
}

#[test]
fn single_item_script_reaches_ready() {
    let script = r#"{
        "events": [
            { "at_ms": 0, "type": "reading", "weight": 0.2 },
            { "at_ms": 1200, "type": "scan", "code": "4901234567894" },
            { "at_ms": 1600, "type": "reading", "weight": 0.86, "stable": false },
            { "at_ms": 1900, "type": "reading", "weight": 0.86 }
        ]
    }"#;
    let (report, sink) = run(&[("soup", 2)], script);

    assert!(report.snapshot.ready);
    assert_eq!(report.snapshot.portions_done, 2);
    assert!(report
        .checklist
        .items()
        .iter()
        .all(|item| item.status == ItemStatus::Done));
    assert_eq!(sink.count_key("order:ready"), 1);
}

#[test]
fn two_items_with_a_wrong_weight_in_between() {
    let script = r#"{
        "events": [
            { "at_ms": 0, "type": "reading", "weight": 0.2 },
            { "at_ms": 1500, "type": "reading", "weight": 0.95 },
            { "at_ms": 2600, "type": "reading", "weight": 0.86 },
            { "at_ms": 4500, "type": "reading", "weight": 1.11 }
        ]
    }"#;
    let (report, sink) = run(&[("soup", 2), ("rice", 1)], script);

    assert!(report.snapshot.ready);
    assert_eq!(sink.count_key("weight:item-0-0"), 1);
    assert_eq!(report.snapshot.counts.done, 3);
}

#[test]
fn leaving_mid_run_keeps_checklist_and_stops() {
    let script = r#"{
        "events": [
            { "at_ms": 0, "type": "reading", "weight": 0.2 },
            { "at_ms": 500, "type": "leave" },
            { "at_ms": 3000, "type": "reading", "weight": 0.86 }
        ]
    }"#;
    let (report, _) = run(&[("soup", 2)], script);

    assert!(!report.snapshot.ready);
    assert_eq!(report.snapshot.polling_mode.label(), "idle");
    assert_eq!(report.snapshot.portions_done, 0);
}
