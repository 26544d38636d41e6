use crate::bicycle::{Bicycle, BicycleOps, UnlockOutcome};
use crate::error::FleetError;
use crate::models::{BicycleKind, Point};

/// GPS tracking decoration. After delegating a location update it records
/// the fix and emits a best-effort tracking observation to the log. When
/// toggled off it is a pure pass-through.
pub struct GpsTracking {
    inner: Box<dyn BicycleOps>,
    enabled: bool,
    last_fix: Option<Point>,
}

impl GpsTracking {
    pub fn new(inner: Box<dyn BicycleOps>) -> Self {
        GpsTracking {
            inner,
            enabled: true,
            last_fix: None,
        }
    }
}

impl BicycleOps for GpsTracking {
    fn bicycle_id(&self) -> &str {
        self.inner.bicycle_id()
    }

    fn kind(&self) -> BicycleKind {
        self.inner.kind()
    }

    fn in_use(&self) -> bool {
        self.inner.in_use()
    }

    fn speed(&self) -> f64 {
        self.inner.speed()
    }

    fn position(&self) -> Point {
        self.inner.position()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn lock(&mut self) {
        self.inner.lock();
    }

    fn unlock(&mut self) -> Result<(), FleetError> {
        self.inner.unlock()
    }

    fn mark_broken(&mut self) {
        self.inner.mark_broken();
    }

    fn mark_repaired(&mut self) {
        self.inner.mark_repaired();
    }

    fn update_location(&mut self, lat: f64, lon: f64) {
        self.inner.update_location(lat, lon);
        if self.enabled {
            let fix = Point::new(lat, lon);
            self.last_fix = Some(fix);
            log::debug!(
                "[gps] {} fix ({:.6}, {:.6})",
                self.inner.bicycle_id(),
                fix.lat,
                fix.lon
            );
        }
    }

    fn base(&self) -> &Bicycle {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut Bicycle {
        self.inner.base_mut()
    }

    fn set_gps_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.enabled = enabled;
        log::info!(
            "[gps] {} tracking {}",
            self.inner.bicycle_id(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn last_gps_fix(&self) -> Option<Point> {
        if self.enabled {
            self.last_fix
        } else {
            None
        }
    }

    // Other capabilities may sit deeper in the chain; forward their ops.

    fn unlock_with_code(&mut self, code: &str) -> Result<UnlockOutcome, FleetError> {
        self.inner.unlock_with_code(code)
    }

    fn current_unlock_code(&self) -> Option<String> {
        self.inner.current_unlock_code()
    }

    fn reset_smart_lock(&mut self) -> Result<(), FleetError> {
        self.inner.reset_smart_lock()
    }

    fn set_smart_lock_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.inner.set_smart_lock_enabled(enabled)
    }

    fn set_alarm_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.inner.set_alarm_enabled(enabled)
    }

    fn reset_alarm(&mut self) -> Result<(), FleetError> {
        self.inner.reset_alarm()
    }

    fn alarm_triggered(&self) -> bool {
        self.inner.alarm_triggered()
    }
}
