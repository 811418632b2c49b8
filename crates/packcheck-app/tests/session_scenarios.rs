//! Assembly session scenarios driven on a simulated clock
//!
//! Every test uses a scripted scale and an in-memory notification sink, so
//! timers, polling and alerts can be checked without hardware.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use packcheck_app::session::ScanOutcome;
use packcheck_app::{prepare_order, AssemblySession, Config, PreparedOrder, SessionError};
use packcheck_domain::model::{
    BoxSettings, ItemStatus, Order, OrderLine, OrderStatus, PollingMode, WeightTolerancePolicy,
};
use packcheck_domain::service::{box_item_id, product_item_id, ScanRejection};
use packcheck_infra::{CsvCatalog, MemorySink, ScriptedScale};
use packcheck_types::{Error, PackingMode, Severity};

const CATALOG: &str = "\
sku,name,unit_weight_kg,barcode
A,Item A,0.33,4900000000017
B,Item B,0.3,4900000000024
C,Item C,0.1,4900000000031
P,Pie,0.3,4900000000048
";

type Session = AssemblySession<ScriptedScale, MemorySink>;

fn t(ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap() + Duration::milliseconds(ms)
}

fn order(id: &str, status: OrderStatus, lines: &[(&str, u32)]) -> Order {
    Order {
        id: id.to_string(),
        status,
        items: lines
            .iter()
            .map(|(sku, quantity)| OrderLine {
                sku: sku.to_string(),
                name: format!("Item {}", sku),
                quantity: *quantity,
            })
            .collect(),
    }
}

fn prepared(order: Order, boxes: &[BoxSettings]) -> PreparedOrder {
    let catalog = CsvCatalog::from_csv_str(CATALOG).unwrap();
    prepare_order(order, &catalog, Some(boxes), PackingMode::Economical)
}

fn session_with(config: Config) -> Session {
    AssemblySession::new(
        ScriptedScale::new(t(0)),
        MemorySink::new(),
        config,
        // ±0.02 kg regardless of weight
        WeightTolerancePolicy::combined(0.0, 20.0),
    )
}

fn session() -> Session {
    session_with(Config::default())
}

fn step(session: &mut Session, ms: i64) {
    session.device_mut().advance_to(t(ms));
    session.tick(t(ms));
}

fn status(session: &Session, id: &str) -> ItemStatus {
    session.checklist().get(id).unwrap().status
}

fn small_box() -> BoxSettings {
    BoxSettings::new("S", 4, 0.2)
}

/// Order with item A (2 portions, 0.66 kg) in one 0.20 kg box, loaded and
/// weighed up to the point where A is pending
fn item_a_pending() -> Session {
    let mut s = session();
    s.device_mut().place(0.2, true);
    s.load_order(prepared(order("SO-A", OrderStatus::New, &[("A", 2)]), &[small_box()]), t(0));
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Pending);

    step(&mut s, 0);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Success);

    step(&mut s, 1000);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Confirmed);
    assert_eq!(status(&s, &product_item_id(0, 0)), ItemStatus::Pending);
    s
}

// ========================================
// Scenario tests
// ========================================

#[test]
fn scenario_a_scan_and_weigh_completes_order() {
    let mut s = item_a_pending();
    let a = product_item_id(0, 0);

    // Empty box still on the scale: nothing happens
    step(&mut s, 1100);
    assert_eq!(status(&s, &a), ItemStatus::Pending);

    assert_eq!(s.handle_scan("4900000000017", t(1100)), ScanOutcome::Selected(a.clone()));
    assert_eq!(status(&s, &a), ItemStatus::Pending);

    s.device_mut().place(0.86, true);
    step(&mut s, 1250);
    assert_eq!(status(&s, &a), ItemStatus::Success);
    assert!(s.is_ready());
    assert_eq!(s.polling_mode(), PollingMode::Reserve);

    step(&mut s, 2250);
    assert_eq!(status(&s, &a), ItemStatus::Done);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Done);
    assert!(s.mark_ready().is_ok());
    assert_eq!(s.sink().count_key("order:ready"), 1);
}

#[test]
fn scenario_b_mismatch_reverts_to_pending() {
    let mut s = item_a_pending();
    let a = product_item_id(0, 0);

    s.device_mut().place(0.95, true);
    step(&mut s, 1250);
    assert_eq!(status(&s, &a), ItemStatus::Error);
    assert_eq!(s.sink().with_severity(Severity::Error).len(), 1);
    assert!(!s.is_ready());

    // Error settle is 600 ms
    step(&mut s, 1750);
    assert_eq!(status(&s, &a), ItemStatus::Error);
    step(&mut s, 1850);
    assert_eq!(status(&s, &a), ItemStatus::Pending);

    // The same wrong weight does not fail again
    step(&mut s, 2000);
    assert_eq!(status(&s, &a), ItemStatus::Pending);

    s.device_mut().place(0.86, true);
    step(&mut s, 2250);
    assert_eq!(status(&s, &a), ItemStatus::Success);
}

#[test]
fn scenario_c_overflow_blocks_ready() {
    let boxes = [BoxSettings::new("L", 10, 0.3), BoxSettings::new("L", 10, 0.3)];
    let prepared = prepared(
        order("SO-C", OrderStatus::New, &[("A", 10), ("B", 10), ("C", 5)]),
        &boxes,
    );
    assert_eq!(prepared.plan.unallocated_portions, 5);
    assert_eq!(prepared.plan.overflow_labels(), vec!["Item C × 5".to_string()]);

    let mut s = session();
    s.load_order(prepared, t(0));
    assert_eq!(s.sink().count_key("plan:overflow"), 1);
    assert!(!s.is_ready());
    match s.mark_ready() {
        Err(SessionError::Core(Error::AllocationOverflow { portions, items })) => {
            assert_eq!(portions, 5);
            assert_eq!(items, vec!["Item C × 5".to_string()]);
        }
        other => panic!("expected overflow, got {:?}", other),
    }
}

#[test]
fn scenario_d_scan_for_other_box_is_rejected_once() {
    let boxes = [BoxSettings::new("S", 2, 0.2), BoxSettings::new("S", 2, 0.2)];
    let mut s = session();
    s.load_order(
        prepared(order("SO-D", OrderStatus::New, &[("A", 2), ("B", 2)]), &boxes),
        t(0),
    );
    let before = s.state().clone();

    let outcome = s.handle_scan("4900000000024", t(100));
    assert!(matches!(
        outcome,
        ScanOutcome::Rejected(ScanRejection::OtherBox {
            box_index: 1,
            active_box: 0,
            ..
        })
    ));
    assert_eq!(s.state(), &before);

    // Outside the scan cooldown, inside the alert cooldown
    let again = s.handle_scan("4900000000024", t(1700));
    assert!(matches!(again, ScanOutcome::Rejected(_)));
    assert_eq!(s.state(), &before);
    assert_eq!(s.sink().with_severity(Severity::Warning).len(), 1);
    assert_eq!(s.active_box(), 0);
}

#[test]
fn scenario_e_ready_order_is_pre_completed() {
    let mut s = session();
    s.load_order(
        prepared(order("SO-E", OrderStatus::ReadyToShip, &[("A", 2), ("B", 1)]), &[small_box()]),
        t(0),
    );

    assert!(s.is_ready());
    assert!(s.mark_ready().is_ok());
    assert!(s.state().weighing_paused);
    assert_eq!(s.transitions(), 0);
    assert!(s
        .checklist()
        .products()
        .all(|item| item.status == ItemStatus::Done));
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Confirmed);

    s.device_mut().place(3.0, true);
    step(&mut s, 500);
    assert_eq!(s.transitions(), 0);
}

// ========================================
// Session behaviour
// ========================================

#[test]
fn duplicate_scan_in_cooldown_selects_once() {
    let mut s = session();
    s.load_order(
        prepared(order("SO-F", OrderStatus::New, &[("A", 1), ("B", 1)]), &[small_box()]),
        t(0),
    );
    s.confirm_box(0, t(10)).unwrap();
    let a = product_item_id(0, 0);
    let b = product_item_id(1, 0);
    assert_eq!(status(&s, &a), ItemStatus::Pending);

    let transitions = s.transitions();
    assert_eq!(s.handle_scan("4900000000024", t(100)), ScanOutcome::Selected(b.clone()));
    assert_eq!(s.handle_scan(" 4900000000024 ", t(400)), ScanOutcome::Debounced);
    assert_eq!(s.transitions(), transitions + 1);
    assert_eq!(status(&s, &a), ItemStatus::Default);
    assert_eq!(status(&s, &b), ItemStatus::Pending);
    assert!(s.checklist().pending_invariant_holds());
}

#[test]
fn oversized_settle_delays_do_not_overflow_timers() {
    let config = Config {
        success_settle_ms: u64::MAX,
        error_settle_ms: u64::MAX,
        scan_cooldown_ms: u64::MAX,
        notification_cooldown_ms: u64::MAX,
        active_timeout_ms: u64::MAX,
        ..Config::default()
    };
    let mut s = session_with(config);
    s.device_mut().place(0.2, true);
    s.load_order(prepared(order("SO-H", OrderStatus::New, &[("A", 1)]), &[small_box()]), t(0));

    step(&mut s, 0);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Success);

    step(&mut s, 60_000);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Success);
}

#[test]
fn debug_scan_mode_skips_debounce() {
    let config = Config {
        debug_scan: true,
        ..Config::default()
    };
    let mut s = session_with(config);
    s.load_order(
        prepared(order("SO-G", OrderStatus::New, &[("A", 1)]), &[small_box()]),
        t(0),
    );
    s.confirm_box(0, t(10)).unwrap();
    let a = product_item_id(0, 0);
    assert_eq!(s.handle_scan("4900000000017", t(100)), ScanOutcome::Selected(a.clone()));
    assert_eq!(s.handle_scan("4900000000017", t(101)), ScanOutcome::Selected(a));
}

#[test]
fn order_switch_drops_timers_and_resets_state() {
    let mut s = session();
    s.device_mut().place(0.2, true);
    s.load_order(prepared(order("SO-1", OrderStatus::New, &[("A", 2)]), &[small_box()]), t(0));
    step(&mut s, 0);
    // Box verified, settle timer armed for box-0
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Success);
    assert!(s.state().baseline_weight.is_some());
    let first_epoch = s.epoch();

    s.device_mut().set_connected(false);
    let other_box = BoxSettings::new("M", 8, 0.35);
    s.load_order(prepared(order("SO-2", OrderStatus::New, &[("B", 3)]), &[other_box]), t(300));

    assert_eq!(s.epoch(), first_epoch + 1);
    assert_eq!(s.order().unwrap().order_id(), "SO-2");
    assert!(s.state().baseline_weight.is_none());
    assert!(s.state().last_evaluated.is_none());
    assert!(s.state().failed_weight.is_none());
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Pending);

    // The old settle time passes; SO-2's box-0 must not be confirmed by it
    step(&mut s, 1000);
    step(&mut s, 1500);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Pending);
    assert_eq!(s.sink().count_key("hardware:scale"), 1);
}

#[test]
fn hardware_failure_never_changes_state() {
    let mut s = item_a_pending();
    let before = s.state().clone();
    s.device_mut().set_connected(false);
    step(&mut s, 1250);
    step(&mut s, 1500);
    assert_eq!(s.state(), &before);
    assert_eq!(s.sink().count_key("hardware:scale"), 1);
}

#[test]
fn leaving_stops_polling_and_timers() {
    let mut s = session();
    s.device_mut().place(0.2, true);
    s.load_order(prepared(order("SO-L", OrderStatus::New, &[("A", 1)]), &[small_box()]), t(0));
    step(&mut s, 0);
    assert!(s.pending_timers() > 0);

    s.leave();
    assert_eq!(s.polling_mode(), PollingMode::Idle);
    assert_eq!(s.pending_timers(), 0);

    let polls = s.device().polls;
    step(&mut s, 5000);
    assert_eq!(s.device().polls, polls);
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Success);
    assert!(s.confirm_box(0, t(5000)).is_err());
}

#[test]
fn active_polling_times_out_to_reserve() {
    let mut s = item_a_pending();
    assert_eq!(s.polling_mode(), PollingMode::Active);
    step(&mut s, 21_000);
    assert_eq!(s.polling_mode(), PollingMode::Reserve);
}

#[test]
fn auto_advance_moves_to_next_box() {
    let config = Config {
        auto_advance_box: true,
        ..Config::default()
    };
    let boxes = [BoxSettings::new("S", 2, 0.2), BoxSettings::new("S", 2, 0.2)];
    let mut s = session_with(config);
    s.device_mut().place(0.2, true);
    s.load_order(
        prepared(order("SO-H", OrderStatus::New, &[("P", 2), ("B", 2)]), &boxes),
        t(0),
    );
    step(&mut s, 0);
    step(&mut s, 1000);
    let pie = product_item_id(0, 0);
    assert_eq!(status(&s, &pie), ItemStatus::Pending);

    s.device_mut().place(0.8, true);
    step(&mut s, 1250);
    assert_eq!(status(&s, &pie), ItemStatus::Success);
    step(&mut s, 2250);

    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::Done);
    assert_eq!(s.active_box(), 1);
    assert_eq!(status(&s, &box_item_id(1)), ItemStatus::Pending);
    assert!(!s.is_ready());
}

#[test]
fn unknown_catalog_sku_disables_weighing() {
    let mut s = session();
    s.device_mut().place(0.2, true);
    s.load_order(
        prepared(order("SO-X", OrderStatus::New, &[("A", 1), ("ZZ", 1)]), &[small_box()]),
        t(0),
    );
    assert_eq!(s.sink().count_key("weighing:disabled"), 1);
    assert_eq!(s.checklist().products().count(), 2);

    step(&mut s, 0);
    step(&mut s, 2000);
    assert_eq!(s.transitions(), 0);
    assert!(!s.is_ready());

    // Nothing can be weighed, so nothing may become pending
    s.select_item(&box_item_id(0), t(2100)).unwrap();
    assert_eq!(status(&s, &box_item_id(0)), ItemStatus::AwaitingConfirmation);
    assert_eq!(s.polling_mode(), PollingMode::Reserve);
    assert_eq!(s.sink().count_key("weighing:paused"), 1);
}
