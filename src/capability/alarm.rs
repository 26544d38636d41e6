use std::sync::Arc;
use time::OffsetDateTime;

use crate::bicycle::{Bicycle, BicycleOps, UnlockOutcome};
use crate::error::FleetError;
use crate::models::{BicycleKind, Point};
use crate::notify::{BicycleEvent, StatusSubject, UNAUTHORIZED_MOVEMENT};

/// Anti-theft alarm decoration. While enabled and the bicycle is parked, a
/// location update whose planar displacement from the last known position
/// exceeds the threshold latches the alarm and raises exactly one
/// unauthorized-movement alert through the bicycle's subject. Further
/// movement stays silent until the alarm is reset.
pub struct AntiTheftAlarm {
    inner: Box<dyn BicycleOps>,
    alerts: Arc<StatusSubject>,
    threshold: f64,
    enabled: bool,
    triggered: bool,
    last_known: Point,
    last_update: OffsetDateTime,
}

impl AntiTheftAlarm {
    /// Seeds the last-known position from the wrapped bicycle so attaching
    /// the alarm to an already-placed bicycle cannot trip it.
    pub fn new(inner: Box<dyn BicycleOps>, alerts: Arc<StatusSubject>, threshold: f64) -> Self {
        let last_known = inner.position();
        AntiTheftAlarm {
            inner,
            alerts,
            threshold,
            enabled: true,
            triggered: false,
            last_known,
            last_update: OffsetDateTime::now_utc(),
        }
    }

    pub fn last_update(&self) -> OffsetDateTime {
        self.last_update
    }

    fn check_unauthorized_movement(&mut self, new_pos: Point) {
        let displacement = self.last_known.planar_distance(&new_pos);
        if displacement > self.threshold && !self.triggered {
            self.triggered = true;
            log::warn!(
                "[alarm] {} moved {:.4} units while parked",
                self.inner.bicycle_id(),
                displacement
            );
            self.alerts.notify(
                BicycleEvent::LocationChange,
                &format!(
                    "{} detected at ({:.6}, {:.6})",
                    UNAUTHORIZED_MOVEMENT, new_pos.lat, new_pos.lon
                ),
            );
        }
    }
}

impl BicycleOps for AntiTheftAlarm {
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
        let new_pos = Point::new(lat, lon);
        // Movement during a rental is the rider's; only parked movement is
        // suspicious.
        if self.enabled && !self.inner.in_use() {
            self.check_unauthorized_movement(new_pos);
        }
        self.last_known = new_pos;
        self.last_update = OffsetDateTime::now_utc();
    }

    fn base(&self) -> &Bicycle {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut Bicycle {
        self.inner.base_mut()
    }

    fn set_alarm_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.enabled = enabled;
        self.triggered = false;
        log::info!(
            "[alarm] {} {}",
            self.inner.bicycle_id(),
            if enabled { "armed" } else { "disarmed" }
        );
        Ok(())
    }

    fn reset_alarm(&mut self) -> Result<(), FleetError> {
        self.triggered = false;
        log::info!("[alarm] {} reset", self.inner.bicycle_id());
        Ok(())
    }

    fn alarm_triggered(&self) -> bool {
        self.triggered
    }

    // Forward the other capabilities' operations down the chain.

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

    fn set_gps_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.inner.set_gps_enabled(enabled)
    }

    fn last_gps_fix(&self) -> Option<Point> {
        self.inner.last_gps_fix()
    }
}
