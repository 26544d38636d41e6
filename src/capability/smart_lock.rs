use rand::Rng;

use crate::bicycle::{Bicycle, BicycleOps, UnlockOutcome};
use crate::error::FleetError;
use crate::models::{BicycleKind, Point};

/// Smart lock decoration. Riders unlock with a 4-digit code; the code is
/// regenerated on every lock and the consecutive-failure counter feeds a
/// soft lockout.
///
/// The lockout is advisory: once the limit is reached a notice is raised,
/// but a later correct code is still evaluated. This matches the reference
/// behavior (see DESIGN.md).
pub struct SmartLock {
    inner: Box<dyn BicycleOps>,
    code: String,
    failed_attempts: u32,
    max_attempts: u32,
    enabled: bool,
}

impl SmartLock {
    pub fn new(inner: Box<dyn BicycleOps>, max_attempts: u32) -> Self {
        SmartLock {
            inner,
            code: generate_code(),
            failed_attempts: 0,
            max_attempts,
            enabled: true,
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }
}

fn generate_code() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

impl BicycleOps for SmartLock {
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

    /// Delegates, then rotates the code and clears the failure counter so
    /// every rental cycle starts fresh.
    fn lock(&mut self) {
        self.inner.lock();
        self.code = generate_code();
        self.failed_attempts = 0;
        log::debug!("[smart-lock] {} new code issued", self.inner.bicycle_id());
    }

    /// The operator path: no code check, straight delegation. The rider
    /// path is `unlock_with_code`.
    fn unlock(&mut self) -> Result<(), FleetError> {
        log::info!(
            "[smart-lock] {} unlocked without code entry",
            self.inner.bicycle_id()
        );
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
    }

    fn base(&self) -> &Bicycle {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut Bicycle {
        self.inner.base_mut()
    }

    fn unlock_with_code(&mut self, code: &str) -> Result<UnlockOutcome, FleetError> {
        if !self.enabled {
            // Disabled lock: no code check, straight delegation.
            self.inner.unlock()?;
            return Ok(UnlockOutcome::Unlocked);
        }
        if code == self.code {
            self.inner.unlock()?;
            self.failed_attempts = 0;
            Ok(UnlockOutcome::Unlocked)
        } else {
            self.failed_attempts += 1;
            let locked_out = self.failed_attempts >= self.max_attempts;
            log::warn!(
                "[smart-lock] {} wrong code ({}/{})",
                self.inner.bicycle_id(),
                self.failed_attempts,
                self.max_attempts
            );
            if locked_out {
                log::warn!(
                    "[smart-lock] {} attempt limit reached, lockout notice raised",
                    self.inner.bicycle_id()
                );
            }
            Ok(UnlockOutcome::WrongCode {
                attempts: self.failed_attempts,
                locked_out,
            })
        }
    }

    fn current_unlock_code(&self) -> Option<String> {
        Some(self.code.clone())
    }

    /// Administrative reset: clears the failure counter and issues a new
    /// code.
    fn reset_smart_lock(&mut self) -> Result<(), FleetError> {
        self.failed_attempts = 0;
        self.code = generate_code();
        log::info!("[smart-lock] {} reset by administrator", self.inner.bicycle_id());
        Ok(())
    }

    fn set_smart_lock_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.enabled = enabled;
        if enabled {
            // Re-arming starts a fresh cycle.
            self.code = generate_code();
            self.failed_attempts = 0;
        }
        log::info!(
            "[smart-lock] {} {}",
            self.inner.bicycle_id(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn set_gps_enabled(&mut self, enabled: bool) -> Result<(), FleetError> {
        self.inner.set_gps_enabled(enabled)
    }

    fn last_gps_fix(&self) -> Option<Point> {
        self.inner.last_gps_fix()
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
