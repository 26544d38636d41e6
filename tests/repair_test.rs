mod common;

use common::{init, seeded_harness, seeded_harness_with, RecordingObserver};
use serial_test::serial;
use std::time::Duration;

use spoke::config::FleetConfig;
use spoke::error::FleetError;
use spoke::models::RepairStatus;
use spoke::notify::BicycleEvent;
use spoke::store::RecordStore;

#[tokio::test]
#[serial]
async fn report_approve_complete_flow() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();
    let recorder = RecordingObserver::new("recorder");
    h.fleet.subscribe_observer("REG001", recorder.clone()).unwrap();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    assert_eq!(report.status, RepairStatus::Pending);
    assert_eq!(recorder.count_of(BicycleEvent::Maintenance), 1);
    // Reporting alone does not pull the bicycle from service.
    assert!(h.fleet.is_available("REG001").unwrap());

    svc.approve(&report.report_id, "admin-1", "confirmed, sending crew").unwrap();
    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Approved);
    assert_eq!(stored.admin_id, "admin-1");
    assert!(!stored.approved_time.is_empty());
    assert!(stored.fixed_time.is_empty());

    assert!(!h.fleet.is_available("REG001").unwrap());
    assert!(!h.bicycles.get("REG001").unwrap().unwrap().is_available);
    assert_eq!(recorder.count_of(BicycleEvent::Broken), 1);

    assert!(svc.complete(&report.report_id).unwrap());
    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Fixed);
    assert!(!stored.fixed_time.is_empty());
    assert!(h.fleet.is_available("REG001").unwrap());
    assert!(h.bicycles.get("REG001").unwrap().unwrap().is_available);

    // Completing twice is a no-op, not an error.
    assert!(!svc.complete(&report.report_id).unwrap());
}

#[tokio::test]
#[serial]
async fn reject_leaves_the_bicycle_alone() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "saddle feels loose").unwrap();
    svc.reject(&report.report_id, "admin-1", "inspected, within tolerance").unwrap();

    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Rejected);
    assert_eq!(stored.admin_response, "inspected, within tolerance");
    assert!(h.fleet.is_available("REG001").unwrap());
    assert!(h.bicycles.get("REG001").unwrap().unwrap().is_available);

    // A rejected report is closed for good.
    assert!(matches!(
        svc.complete(&report.report_id).unwrap_err(),
        FleetError::InvalidState(_)
    ));
    assert!(matches!(
        svc.approve(&report.report_id, "admin-2", "second look").unwrap_err(),
        FleetError::InvalidState(_)
    ));
}

#[tokio::test]
#[serial]
async fn complete_requires_approval_first() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "brakes grinding").unwrap();
    assert!(matches!(
        svc.complete(&report.report_id).unwrap_err(),
        FleetError::InvalidState(_)
    ));
}

#[tokio::test]
#[serial]
async fn approve_is_single_shot() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    svc.approve(&report.report_id, "admin-1", "on it").unwrap();
    assert!(matches!(
        svc.approve(&report.report_id, "admin-2", "me too").unwrap_err(),
        FleetError::InvalidState(_)
    ));
}

#[tokio::test]
#[serial]
async fn unknown_ids_are_not_found() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();

    assert!(matches!(
        svc.report("GHOST", "alice", "does not exist").unwrap_err(),
        FleetError::NotFound(_)
    ));
    assert!(matches!(
        svc.approve("RPT-missing", "admin-1", "?").unwrap_err(),
        FleetError::NotFound(_)
    ));
    assert!(matches!(svc.complete("RPT-missing").unwrap_err(), FleetError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn approved_repair_auto_completes() {
    init();
    let h = seeded_harness_with(FleetConfig {
        auto_repair_delay_ms: 50,
        ..FleetConfig::default()
    });
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    svc.approve(&report.report_id, "admin-1", "confirmed").unwrap();
    assert!(!h.fleet.is_available("REG001").unwrap());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Fixed);
    assert!(!stored.fixed_time.is_empty());
    assert!(h.fleet.is_available("REG001").unwrap());
    assert!(h.bicycles.get("REG001").unwrap().unwrap().is_available);
}

#[tokio::test]
#[serial]
async fn manual_complete_beats_the_timer() {
    init();
    let h = seeded_harness_with(FleetConfig {
        auto_repair_delay_ms: 10_000,
        ..FleetConfig::default()
    });
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    svc.approve(&report.report_id, "admin-1", "confirmed").unwrap();

    // Crew finished early; the pending timer is cancelled.
    assert!(svc.complete(&report.report_id).unwrap());
    assert!(h.fleet.is_available("REG001").unwrap());

    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Fixed);
}

#[tokio::test]
#[serial]
async fn admin_and_monitor_both_see_the_fault() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();
    let admin = std::sync::Arc::new(spoke::notify::AdminNotifier::new("admin-1", "operations", 100));
    let monitor = std::sync::Arc::new(spoke::notify::SystemMonitor::new("fleet-monitor", 10));
    h.fleet.subscribe_observer("REG001", admin.clone()).unwrap();
    h.fleet.subscribe_observer("REG001", monitor.clone()).unwrap();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    svc.approve(&report.report_id, "admin-1", "confirmed").unwrap();

    // MAINTENANCE from the report, BROKEN from the approval; both critical.
    assert_eq!(monitor.event_count(), 2);
    assert_eq!(monitor.critical_count(), 2);
    let history = admin.alert_history();
    assert_eq!(history.len(), 2);
    assert!(history[0].contains("MAINTENANCE"));
    assert!(history[1].contains("BROKEN"));
}

// No async runtime here on purpose: approving must not require one.
#[test]
#[serial]
fn approve_without_a_runtime_skips_the_timer() {
    init();
    let h = seeded_harness_with(FleetConfig {
        auto_repair_delay_ms: 60_000,
        ..FleetConfig::default()
    });
    let svc = h.repair_service();

    let report = svc.report("REG001", "alice", "flat tire").unwrap();
    svc.approve(&report.report_id, "admin-1", "confirmed").unwrap();

    let stored = h.reports.get(&report.report_id).unwrap().unwrap();
    assert_eq!(stored.status, RepairStatus::Approved);
    assert!(!h.fleet.is_available("REG001").unwrap());

    // Manual completion still closes the report out.
    assert!(svc.complete(&report.report_id).unwrap());
    assert!(h.fleet.is_available("REG001").unwrap());
}

#[tokio::test]
#[serial]
async fn pending_reports_filter_by_status() {
    init();
    let h = seeded_harness();
    let svc = h.repair_service();

    let first = svc.report("REG001", "alice", "flat tire").unwrap();
    let second = svc.report("ELE001", "bob", "battery rattles").unwrap();
    assert_eq!(svc.pending_reports().unwrap().len(), 2);

    svc.reject(&first.report_id, "admin-1", "no fault found").unwrap();
    let pending = svc.pending_reports().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].report_id, second.report_id);

    assert_eq!(svc.reports_for_bicycle("REG001").unwrap().len(), 1);
    assert_eq!(svc.reports_for_bicycle("ELE001").unwrap().len(), 1);
}
