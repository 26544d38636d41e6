//! Repair workflow: riders flag broken bicycles, administrators approve or
//! reject, and an approved repair auto-completes after a configured delay.
//!
//! Report transitions are monotonic (PENDING -> APPROVED -> FIXED, or
//! PENDING -> REJECTED) and serialized by a workflow-wide mutex, so a
//! foreground approve/reject and the background auto-complete can never
//! interleave inconsistently. `complete` is idempotent: a second firing on
//! an already-FIXED report is a no-op.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::models::{new_report_id, now_rfc3339, BicycleRecord, RepairRecord, RepairStatus};
use crate::store::RecordStore;

pub struct RepairService {
    fleet: Arc<Fleet>,
    bicycles: Arc<dyn RecordStore<BicycleRecord>>,
    reports: Arc<dyn RecordStore<RepairRecord>>,
    auto_delay: Duration,
    /// Serializes every report transition against the background timer.
    gate: Mutex<()>,
    /// Pending auto-complete tasks, keyed by report id, for explicit
    /// cancellation.
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    /// Self-handle cloned into spawned timers.
    me: Weak<RepairService>,
}

impl RepairService {
    pub fn new(
        fleet: Arc<Fleet>,
        bicycles: Arc<dyn RecordStore<BicycleRecord>>,
        reports: Arc<dyn RecordStore<RepairRecord>>,
    ) -> Arc<Self> {
        let auto_delay = Duration::from_millis(fleet.config().auto_repair_delay_ms);
        Arc::new_cyclic(|me| RepairService {
            fleet,
            bicycles,
            reports,
            auto_delay,
            gate: Mutex::new(()),
            timers: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Files a PENDING repair report and broadcasts a MAINTENANCE event.
    pub fn report(
        &self,
        bicycle_id: &str,
        user_id: &str,
        description: &str,
    ) -> Result<RepairRecord, FleetError> {
        self.bicycles
            .get(bicycle_id)?
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;

        let record = RepairRecord::new(new_report_id(), bicycle_id, user_id, description);
        self.reports.upsert(record.clone())?;

        if let Some(subject) = self.fleet.subject(bicycle_id) {
            subject.maintenance_required(description);
        }
        log::info!(
            "{} reported {} broken: {} ({})",
            user_id,
            bicycle_id,
            description,
            record.report_id
        );
        Ok(record)
    }

    /// Approves a PENDING report: stamps the admin and time, takes the
    /// bicycle out of the available pool, broadcasts BROKEN, and schedules
    /// the fire-once auto-complete timer.
    pub fn approve(
        &self,
        report_id: &str,
        admin_id: &str,
        response: &str,
    ) -> Result<(), FleetError> {
        {
            let _gate = self.gate.lock();
            let mut report = self.get_report(report_id)?;
            if report.status != RepairStatus::Pending {
                return Err(FleetError::invalid_state(format!(
                    "report {} already handled ({:?})",
                    report_id, report.status
                )));
            }
            report.status = RepairStatus::Approved;
            report.admin_id = admin_id.to_string();
            report.admin_response = response.to_string();
            report.approved_time = now_rfc3339();
            let bicycle_id = report.bicycle_id.clone();
            let description = report.description.clone();
            self.reports.upsert(report)?;

            self.set_bicycle_availability(&bicycle_id, false)?;
            if let Some(subject) = self.fleet.subject(&bicycle_id) {
                subject.broken(&description);
            }
            log::info!("{} approved report {}, {} out of service", admin_id, report_id, bicycle_id);
        }

        if !self.auto_delay.is_zero() {
            self.schedule_auto_complete(report_id);
        }
        Ok(())
    }

    /// Rejects a PENDING report. The bicycle is untouched.
    pub fn reject(&self, report_id: &str, admin_id: &str, response: &str) -> Result<(), FleetError> {
        let _gate = self.gate.lock();
        let mut report = self.get_report(report_id)?;
        if report.status != RepairStatus::Pending {
            return Err(FleetError::invalid_state(format!(
                "report {} already handled ({:?})",
                report_id, report.status
            )));
        }
        report.status = RepairStatus::Rejected;
        report.admin_id = admin_id.to_string();
        report.admin_response = response.to_string();
        self.reports.upsert(report)?;
        log::info!("{} rejected report {}: {}", admin_id, report_id, response);
        Ok(())
    }

    /// Completes an APPROVED repair: stamps the fixed time and restores
    /// the bicycle to the available pool. Timer-driven or invoked by an
    /// administrator. Returns whether a transition happened; a repeat call
    /// on a FIXED report is a no-op.
    pub fn complete(&self, report_id: &str) -> Result<bool, FleetError> {
        let _gate = self.gate.lock();
        let mut report = self.get_report(report_id)?;
        match report.status {
            RepairStatus::Fixed => {
                self.cancel_auto_complete(report_id);
                Ok(false)
            }
            RepairStatus::Approved => {
                report.status = RepairStatus::Fixed;
                report.fixed_time = now_rfc3339();
                let bicycle_id = report.bicycle_id.clone();
                self.reports.upsert(report)?;

                if self.fleet.contains(&bicycle_id) {
                    self.fleet.mark_repaired(&bicycle_id)?;
                }
                self.set_bicycle_availability(&bicycle_id, true)?;
                self.cancel_auto_complete(report_id);
                log::info!("report {} fixed, {} back in service", report_id, bicycle_id);
                Ok(true)
            }
            RepairStatus::Pending | RepairStatus::Rejected => {
                Err(FleetError::invalid_state(format!(
                    "report {} is not approved ({:?})",
                    report_id, report.status
                )))
            }
        }
    }

    pub fn pending_reports(&self) -> Result<Vec<RepairRecord>, FleetError> {
        self.reports
            .scan(&|r: &RepairRecord| r.status == RepairStatus::Pending)
    }

    pub fn reports_for_bicycle(&self, bicycle_id: &str) -> Result<Vec<RepairRecord>, FleetError> {
        self.reports.scan(&|r: &RepairRecord| r.bicycle_id == bicycle_id)
    }

    /// Aborts every pending auto-complete task.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock();
        for (report_id, handle) in timers.drain() {
            log::debug!("cancelling auto-complete for {}", report_id);
            handle.abort();
        }
    }

    fn get_report(&self, report_id: &str) -> Result<RepairRecord, FleetError> {
        self.reports
            .get(report_id)?
            .ok_or_else(|| FleetError::not_found(format!("report {}", report_id)))
    }

    fn set_bicycle_availability(&self, bicycle_id: &str, available: bool) -> Result<(), FleetError> {
        if !available && self.fleet.contains(bicycle_id) {
            self.fleet.mark_broken(bicycle_id)?;
        }
        if let Some(mut record) = self.bicycles.get(bicycle_id)? {
            record.is_available = available;
            self.bicycles.upsert(record)?;
        }
        Ok(())
    }

    fn schedule_auto_complete(&self, report_id: &str) {
        // Without a runtime the report simply waits for a manual complete.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime, report {} will not auto-complete", report_id);
            return;
        };
        let Some(service) = self.me.upgrade() else {
            return;
        };
        let id = report_id.to_string();
        let delay = self.auto_delay;
        log::info!("report {} auto-completes in {:?}", id, delay);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match service.complete(&id) {
                Ok(true) => log::info!("report {} auto-completed", id),
                Ok(false) => {}
                Err(e) => log::warn!("auto-complete of report {} failed: {}", id, e),
            }
            service.timers.lock().remove(&id);
        });
        self.timers.lock().insert(report_id.to_string(), handle);
    }

    /// Revokes the pending timer, if any. Aborting the task that is
    /// currently running `complete` is harmless: it has no awaits left.
    fn cancel_auto_complete(&self, report_id: &str) {
        if let Some(handle) = self.timers.lock().remove(report_id) {
            handle.abort();
        }
    }
}

impl Drop for RepairService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
