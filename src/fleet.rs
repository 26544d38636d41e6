//! The owned fleet context: every live bicycle, its decoration chain, and
//! its notification subject.
//!
//! The fleet is an explicit dependency handed to the rental and repair
//! services — there is no process-wide state. All mutation goes through the
//! bicycle's operation surface; capability attach re-wraps the chain in
//! place, so a bicycle keeps its id, subject, and subscribers across
//! decoration.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bicycle::{Bicycle, BicycleOps, UnlockOutcome, LOW_BATTERY_THRESHOLD};
use crate::capability::{AntiTheftAlarm, GpsTracking, SmartLock};
use crate::config::FleetConfig;
use crate::error::FleetError;
use crate::models::Point;
use crate::notify::{Observer, StatusSubject};

pub struct Fleet {
    config: FleetConfig,
    bicycles: RwLock<HashMap<String, Box<dyn BicycleOps>>>,
    subjects: RwLock<HashMap<String, Arc<StatusSubject>>>,
}

impl Fleet {
    pub fn new(config: FleetConfig) -> Self {
        Fleet {
            config,
            bicycles: RwLock::new(HashMap::new()),
            subjects: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Registers a bicycle and creates its paired notification subject.
    /// The subject lives for the rest of the process.
    pub fn add_bicycle(&self, bicycle: Bicycle) {
        let id = bicycle.bicycle_id().to_string();
        log::info!("{} joined the fleet", id);
        self.subjects
            .write()
            .insert(id.clone(), Arc::new(StatusSubject::new(id.clone())));
        self.bicycles.write().insert(id, Box::new(bicycle));
    }

    pub fn contains(&self, bicycle_id: &str) -> bool {
        self.bicycles.read().contains_key(bicycle_id)
    }

    pub fn bicycle_ids(&self) -> Vec<String> {
        self.bicycles.read().keys().cloned().collect()
    }

    pub fn subject(&self, bicycle_id: &str) -> Option<Arc<StatusSubject>> {
        self.subjects.read().get(bicycle_id).cloned()
    }

    pub fn subscribe_observer(
        &self,
        bicycle_id: &str,
        observer: Arc<dyn Observer>,
    ) -> Result<(), FleetError> {
        self.subject(bicycle_id)
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?
            .subscribe(observer);
        Ok(())
    }

    /// Runs a closure against a bicycle's read surface.
    pub fn with_bicycle<T>(
        &self,
        bicycle_id: &str,
        f: impl FnOnce(&dyn BicycleOps) -> T,
    ) -> Result<T, FleetError> {
        let bicycles = self.bicycles.read();
        let bicycle = bicycles
            .get(bicycle_id)
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        Ok(f(bicycle.as_ref()))
    }

    /// Runs a closure against a bicycle's mutable surface.
    pub fn with_bicycle_mut<T>(
        &self,
        bicycle_id: &str,
        f: impl FnOnce(&mut dyn BicycleOps) -> T,
    ) -> Result<T, FleetError> {
        let mut bicycles = self.bicycles.write();
        let bicycle = bicycles
            .get_mut(bicycle_id)
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        Ok(f(bicycle.as_mut()))
    }

    // State-machine forwarding.

    pub fn lock(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.lock())
    }

    pub fn unlock(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.unlock())?
    }

    pub fn mark_broken(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.mark_broken())
    }

    pub fn mark_repaired(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.mark_repaired())
    }

    pub fn is_available(&self, bicycle_id: &str) -> Result<bool, FleetError> {
        self.with_bicycle(bicycle_id, |b| b.is_available())
    }

    pub fn position(&self, bicycle_id: &str) -> Result<Point, FleetError> {
        self.with_bicycle(bicycle_id, |b| b.position())
    }

    /// Moves the bicycle and broadcasts the change. Decorations in the
    /// chain (GPS, anti-theft) observe the move first.
    pub fn update_location(&self, bicycle_id: &str, lat: f64, lon: f64) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.update_location(lat, lon))?;
        if let Some(subject) = self.subject(bicycle_id) {
            subject.location_changed(lat, lon);
        }
        Ok(())
    }

    // Electric operations.

    pub fn charge_battery(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.base_mut().charge_battery())?
    }

    /// Drains the battery; crossing the low-battery threshold broadcasts a
    /// LOW_BATTERY event once.
    pub fn consume_battery(&self, bicycle_id: &str, amount: i32) -> Result<i32, FleetError> {
        let (before, after) = self.with_bicycle_mut(bicycle_id, |b| {
            let before = b.base().battery_level();
            b.base_mut().consume_battery(amount).map(|after| (before, after))
        })??;
        if after <= LOW_BATTERY_THRESHOLD && before.map_or(false, |lvl| lvl > LOW_BATTERY_THRESHOLD) {
            if let Some(subject) = self.subject(bicycle_id) {
                subject.low_battery(after);
            }
        }
        Ok(after)
    }

    pub fn toggle_electric_mode(&self, bicycle_id: &str) -> Result<bool, FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.base_mut().toggle_electric_mode())?
    }

    // Capability attachment. Re-wraps the chain in place; any order, any
    // depth.

    pub fn attach_gps(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.rewrap(bicycle_id, |inner| Box::new(GpsTracking::new(inner)))
    }

    pub fn attach_smart_lock(&self, bicycle_id: &str) -> Result<(), FleetError> {
        let max_attempts = self.config.max_unlock_attempts;
        self.rewrap(bicycle_id, |inner| Box::new(SmartLock::new(inner, max_attempts)))
    }

    pub fn attach_alarm(&self, bicycle_id: &str) -> Result<(), FleetError> {
        let subject = self
            .subject(bicycle_id)
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        let threshold = self.config.movement_alert_threshold;
        self.rewrap(bicycle_id, move |inner| {
            Box::new(AntiTheftAlarm::new(inner, subject, threshold))
        })
    }

    fn rewrap(
        &self,
        bicycle_id: &str,
        wrap: impl FnOnce(Box<dyn BicycleOps>) -> Box<dyn BicycleOps>,
    ) -> Result<(), FleetError> {
        let mut bicycles = self.bicycles.write();
        let inner = bicycles
            .remove(bicycle_id)
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        bicycles.insert(bicycle_id.to_string(), wrap(inner));
        log::info!("{} capability chain extended", bicycle_id);
        Ok(())
    }

    // Capability controls, forwarded through the chain.

    pub fn unlock_with_code(&self, bicycle_id: &str, code: &str) -> Result<UnlockOutcome, FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.unlock_with_code(code))?
    }

    pub fn current_unlock_code(&self, bicycle_id: &str) -> Result<Option<String>, FleetError> {
        self.with_bicycle(bicycle_id, |b| b.current_unlock_code())
    }

    pub fn reset_smart_lock(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.reset_smart_lock())?
    }

    pub fn set_smart_lock_enabled(&self, bicycle_id: &str, enabled: bool) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.set_smart_lock_enabled(enabled))?
    }

    pub fn set_gps_enabled(&self, bicycle_id: &str, enabled: bool) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.set_gps_enabled(enabled))?
    }

    pub fn last_gps_fix(&self, bicycle_id: &str) -> Result<Option<Point>, FleetError> {
        self.with_bicycle(bicycle_id, |b| b.last_gps_fix())
    }

    pub fn set_alarm_enabled(&self, bicycle_id: &str, enabled: bool) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.set_alarm_enabled(enabled))?
    }

    pub fn reset_alarm(&self, bicycle_id: &str) -> Result<(), FleetError> {
        self.with_bicycle_mut(bicycle_id, |b| b.reset_alarm())?
    }

    pub fn alarm_triggered(&self, bicycle_id: &str) -> Result<bool, FleetError> {
        self.with_bicycle(bicycle_id, |b| b.alarm_triggered())
    }
}
