//! Per-bicycle event fan-out: one `StatusSubject` per bicycle pushes typed
//! events to its subscribers in insertion order.
//!
//! Delivery is synchronous and isolated: an observer returning an error is
//! logged and skipped, the rest of the fan-out still runs.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::FleetError;
use crate::models::now_rfc3339;

/// Marker substring carried by LOCATION_CHANGE messages raised by the
/// anti-theft alarm. Admin routing and monitor criticality key off it.
pub const UNAUTHORIZED_MOVEMENT: &str = "unauthorized movement";

/// The event kinds a bicycle can broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BicycleEvent {
    Rent,
    Return,
    Broken,
    Maintenance,
    LowBattery,
    LocationChange,
}

impl std::fmt::Display for BicycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BicycleEvent::Rent => "RENT",
            BicycleEvent::Return => "RETURN",
            BicycleEvent::Broken => "BROKEN",
            BicycleEvent::Maintenance => "MAINTENANCE",
            BicycleEvent::LowBattery => "LOW_BATTERY",
            BicycleEvent::LocationChange => "LOCATION_CHANGE",
        };
        write!(f, "{}", name)
    }
}

/// A subscriber to one bicycle's events. Implementations keep their own
/// state behind interior mutability; the subject shares them as `Arc`s.
pub trait Observer: Send + Sync {
    /// Stable name used for unsubscription and diagnostics.
    fn name(&self) -> &str;

    fn notify(&self, bicycle_id: &str, event: BicycleEvent, message: &str)
        -> Result<(), FleetError>;
}

/// Per-bicycle fan-out hub. Insertion order is notification order.
pub struct StatusSubject {
    bicycle_id: String,
    observers: Mutex<Vec<Arc<dyn Observer>>>,
}

impl StatusSubject {
    pub fn new(bicycle_id: impl Into<String>) -> Self {
        StatusSubject {
            bicycle_id: bicycle_id.into(),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn bicycle_id(&self) -> &str {
        &self.bicycle_id
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        log::info!("{} gained subscriber {}", self.bicycle_id, observer.name());
        self.observers.lock().push(observer);
    }

    pub fn unsubscribe(&self, name: &str) {
        self.observers.lock().retain(|o| o.name() != name);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Delivers the event to every observer, in subscription order. A
    /// failing observer never aborts the remaining fan-out.
    pub fn notify(&self, event: BicycleEvent, message: &str) {
        let observers: Vec<Arc<dyn Observer>> = self.observers.lock().clone();
        log::debug!("{} broadcasting {} to {} observers", self.bicycle_id, event, observers.len());
        for observer in observers {
            if let Err(e) = observer.notify(&self.bicycle_id, event, message) {
                log::error!(
                    "observer {} failed on {} {}: {}",
                    observer.name(),
                    self.bicycle_id,
                    event,
                    e
                );
            }
        }
    }

    // Typed push helpers for the state transitions that broadcast.

    pub fn rented(&self, user_id: &str) {
        self.notify(BicycleEvent::Rent, &format!("rented by {}", user_id));
    }

    pub fn returned(&self, user_id: &str, usage_minutes: f64) {
        self.notify(
            BicycleEvent::Return,
            &format!("returned by {} after {} minutes", user_id, usage_minutes),
        );
    }

    pub fn broken(&self, issue: &str) {
        self.notify(BicycleEvent::Broken, issue);
    }

    pub fn maintenance_required(&self, reason: &str) {
        self.notify(BicycleEvent::Maintenance, reason);
    }

    pub fn low_battery(&self, battery_level: i32) {
        self.notify(
            BicycleEvent::LowBattery,
            &format!("battery at {}%", battery_level),
        );
    }

    pub fn location_changed(&self, lat: f64, lon: f64) {
        self.notify(
            BicycleEvent::LocationChange,
            &format!("moved to ({:.6}, {:.6})", lat, lon),
        );
    }
}

/// Log-level classification used by the system monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warn,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Formats the rider-relevant subset of events. Everything else is
/// deliberately dropped; riders never see fleet internals.
pub struct UserNotifier {
    user_id: String,
    phone: String,
    email: String,
}

impl UserNotifier {
    pub fn new(user_id: impl Into<String>, phone: impl Into<String>, email: impl Into<String>) -> Self {
        UserNotifier {
            user_id: user_id.into(),
            phone: phone.into(),
            email: email.into(),
        }
    }
}

impl Observer for UserNotifier {
    fn name(&self) -> &str {
        &self.user_id
    }

    fn notify(&self, bicycle_id: &str, event: BicycleEvent, message: &str)
        -> Result<(), FleetError> {
        let body = match event {
            BicycleEvent::Rent => format!("rental of {} confirmed", bicycle_id),
            BicycleEvent::Return => format!("return of {} confirmed, thanks for riding", bicycle_id),
            BicycleEvent::LowBattery => format!("{}: {}", bicycle_id, message),
            BicycleEvent::Maintenance => {
                format!("{} needs maintenance ({}), please pick another bicycle", bicycle_id, message)
            }
            // Not rider-relevant.
            _ => return Ok(()),
        };
        log::info!(
            "[rider {} via sms {} / {}] {}",
            self.user_id, self.phone, self.email, body
        );
        Ok(())
    }
}

/// Severity-routes every event for an administrator and keeps a bounded
/// alert history (oldest entries dropped first).
pub struct AdminNotifier {
    admin_id: String,
    department: String,
    history_limit: usize,
    history: Mutex<Vec<String>>,
}

impl AdminNotifier {
    pub fn new(admin_id: impl Into<String>, department: impl Into<String>, history_limit: usize) -> Self {
        AdminNotifier {
            admin_id: admin_id.into(),
            department: department.into(),
            history_limit,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn alert_history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
        log::info!("admin {} alert history cleared", self.admin_id);
    }

    fn record(&self, line: String) {
        let mut history = self.history.lock();
        if history.len() == self.history_limit {
            history.remove(0);
        }
        history.push(line);
    }

    fn critical(&self, kind: &str, bicycle_id: &str, message: &str) {
        log::error!(
            "[admin {} / {}] CRITICAL {}: {} - {}",
            self.admin_id, self.department, kind, bicycle_id, message
        );
    }
}

impl Observer for AdminNotifier {
    fn name(&self) -> &str {
        &self.admin_id
    }

    fn notify(&self, bicycle_id: &str, event: BicycleEvent, message: &str)
        -> Result<(), FleetError> {
        self.record(format!("[{}] {} - {}: {}", now_rfc3339(), bicycle_id, event, message));

        match event {
            BicycleEvent::Broken => self.critical("bicycle fault", bicycle_id, message),
            BicycleEvent::Maintenance => self.critical("maintenance request", bicycle_id, message),
            BicycleEvent::LowBattery => {
                log::info!("[admin {} / {}] {}: {}", self.admin_id, self.department, bicycle_id, message);
            }
            BicycleEvent::LocationChange => {
                // Only unauthorized movement escalates; routine fixes are noise.
                if message.contains(UNAUTHORIZED_MOVEMENT) {
                    self.critical("suspected theft", bicycle_id, message);
                }
            }
            BicycleEvent::Rent | BicycleEvent::Return => {
                log::info!("[admin {} activity] {} - {}: {}", self.admin_id, bicycle_id, event, message);
            }
        }
        Ok(())
    }
}

/// Classifies severity, tallies totals and criticals, and emits an
/// aggregate report every Nth event.
pub struct SystemMonitor {
    system_name: String,
    report_every: u64,
    events: AtomicU64,
    critical_events: AtomicU64,
}

impl SystemMonitor {
    pub fn new(system_name: impl Into<String>, report_every: u64) -> Self {
        SystemMonitor {
            system_name: system_name.into(),
            report_every: report_every.max(1),
            events: AtomicU64::new(0),
            critical_events: AtomicU64::new(0),
        }
    }

    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn critical_count(&self) -> u64 {
        self.critical_events.load(Ordering::Relaxed)
    }

    pub fn reset_stats(&self) {
        self.events.store(0, Ordering::Relaxed);
        self.critical_events.store(0, Ordering::Relaxed);
    }

    fn severity(event: BicycleEvent) -> Severity {
        match event {
            BicycleEvent::Broken | BicycleEvent::Maintenance => Severity::Error,
            BicycleEvent::LowBattery => Severity::Warn,
            BicycleEvent::Rent | BicycleEvent::Return | BicycleEvent::LocationChange => {
                Severity::Info
            }
        }
    }

    fn is_critical(event: BicycleEvent, message: &str) -> bool {
        match event {
            BicycleEvent::Broken | BicycleEvent::Maintenance => true,
            BicycleEvent::LocationChange => message.contains(UNAUTHORIZED_MOVEMENT),
            _ => false,
        }
    }
}

impl Observer for SystemMonitor {
    fn name(&self) -> &str {
        &self.system_name
    }

    fn notify(&self, bicycle_id: &str, event: BicycleEvent, message: &str)
        -> Result<(), FleetError> {
        let total = self.events.fetch_add(1, Ordering::Relaxed) + 1;
        if Self::is_critical(event, message) {
            self.critical_events.fetch_add(1, Ordering::Relaxed);
        }

        log::debug!(
            "[{}] {} bicycle={} event={} message={}",
            self.system_name,
            Self::severity(event),
            bicycle_id,
            event,
            message
        );

        if total % self.report_every == 0 {
            let critical = self.critical_events.load(Ordering::Relaxed);
            log::info!(
                "[{} stats] events={} critical={} critical_ratio={:.1}%",
                self.system_name,
                total,
                critical,
                critical as f64 / total as f64 * 100.0
            );
        }
        Ok(())
    }
}
