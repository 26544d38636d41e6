//! Bicycle lifecycle state machine.
//!
//! A bicycle is in exactly one of three states: locked-available,
//! unlocked-in-use, or locked-broken. Invariants maintained by every
//! operation: in use implies unlocked and not broken; broken implies locked
//! and not in use. Electric bicycles are additionally unavailable at or
//! below the low-battery threshold.

use crate::error::FleetError;
use crate::models::{BicycleKind, Point};

/// Battery percentage at or below which an electric bicycle is unavailable
/// and electric assist shuts off.
pub const LOW_BATTERY_THRESHOLD: i32 = 10;

/// Electric-only state: battery percentage and assist mode.
#[derive(Debug, Clone, Copy)]
pub struct ElectricAssist {
    pub battery_level: i32,
    pub electric_mode: bool,
}

/// Outcome of a coded unlock attempt against a smart lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Code matched; the bicycle is now unlocked and in use.
    Unlocked,
    /// Code rejected. `locked_out` is raised once the consecutive-failure
    /// limit is reached; it is advisory, a later correct code is still
    /// evaluated.
    WrongCode { attempts: u32, locked_out: bool },
}

/// A single bicycle owned by the fleet. Mutated only through these
/// operations, never field by field.
#[derive(Debug)]
pub struct Bicycle {
    id: String,
    kind: BicycleKind,
    locked: bool,
    broken: bool,
    in_use: bool,
    speed: f64,
    position: Point,
    assist: Option<ElectricAssist>,
}

impl Bicycle {
    pub fn regular(id: impl Into<String>) -> Self {
        Bicycle {
            id: id.into(),
            kind: BicycleKind::Regular,
            locked: true,
            broken: false,
            in_use: false,
            speed: 0.0,
            position: Point::ORIGIN,
            assist: None,
        }
    }

    pub fn electric(id: impl Into<String>) -> Self {
        Bicycle {
            id: id.into(),
            kind: BicycleKind::Electric,
            locked: true,
            broken: false,
            in_use: false,
            speed: 0.0,
            position: Point::ORIGIN,
            assist: Some(ElectricAssist {
                battery_level: 100,
                electric_mode: false,
            }),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn battery_level(&self) -> Option<i32> {
        self.assist.map(|a| a.battery_level)
    }

    pub fn electric_mode(&self) -> bool {
        self.assist.map(|a| a.electric_mode).unwrap_or(false)
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Why `unlock` would refuse right now, if it would.
    fn unavailability_reason(&self) -> Option<&'static str> {
        if self.broken {
            return Some("marked broken");
        }
        if self.in_use {
            return Some("already in use");
        }
        if let Some(assist) = self.assist {
            if assist.battery_level <= LOW_BATTERY_THRESHOLD {
                return Some("battery too low");
            }
        }
        None
    }

    // Electric-only operations. Callers reach these through
    // `BicycleOps::base_mut`, so decorations cannot intercept them.

    /// Resets the battery to 100%.
    pub fn charge_battery(&mut self) -> Result<(), FleetError> {
        match self.assist.as_mut() {
            Some(assist) => {
                assist.battery_level = 100;
                log::info!("{} battery fully charged", self.id);
                Ok(())
            }
            None => Err(FleetError::invalid_state(format!(
                "{} is not an electric bicycle",
                self.id
            ))),
        }
    }

    /// Drains the battery, clamping at zero. Assist shuts off automatically
    /// at or below the low-battery threshold. Returns the new level.
    pub fn consume_battery(&mut self, amount: i32) -> Result<i32, FleetError> {
        let id = self.id.clone();
        match self.assist.as_mut() {
            Some(assist) => {
                assist.battery_level = (assist.battery_level - amount).max(0);
                if assist.battery_level <= LOW_BATTERY_THRESHOLD && assist.electric_mode {
                    assist.electric_mode = false;
                    log::warn!("{} electric mode disabled, battery at {}%", id, assist.battery_level);
                }
                Ok(assist.battery_level)
            }
            None => Err(FleetError::invalid_state(format!(
                "{} is not an electric bicycle",
                id
            ))),
        }
    }

    /// Toggles electric assist. Only effective while the bicycle is in use
    /// with battery above the threshold. Returns the new mode.
    pub fn toggle_electric_mode(&mut self) -> Result<bool, FleetError> {
        if !self.in_use {
            return Err(FleetError::invalid_state(format!(
                "{} is not in use",
                self.id
            )));
        }
        let id = self.id.clone();
        match self.assist.as_mut() {
            Some(assist) => {
                if assist.battery_level <= LOW_BATTERY_THRESHOLD {
                    return Err(FleetError::invalid_state(format!(
                        "{} battery too low for electric mode",
                        id
                    )));
                }
                assist.electric_mode = !assist.electric_mode;
                log::info!(
                    "{} electric mode {}",
                    id,
                    if assist.electric_mode { "on" } else { "off" }
                );
                Ok(assist.electric_mode)
            }
            None => Err(FleetError::invalid_state(format!(
                "{} is not an electric bicycle",
                id
            ))),
        }
    }
}

/// The uniform surface of a bicycle, decorated or not.
///
/// Capability decorations wrap a `Box<dyn BicycleOps>` and must forward
/// every operation they do not specialize, so a chain of any depth and
/// order still satisfies the state-machine invariants. Capability-specific
/// operations have refusing default bodies here; a decoration either
/// handles one or forwards it toward the base, which refuses.
pub trait BicycleOps: Send + Sync {
    fn bicycle_id(&self) -> &str;
    fn kind(&self) -> BicycleKind;
    fn in_use(&self) -> bool;
    fn speed(&self) -> f64;
    fn position(&self) -> Point;

    /// Not in use, not broken, and (for electric bicycles) battery above
    /// the threshold.
    fn is_available(&self) -> bool;

    /// To locked-available, unless broken (stays locked-broken). Resets
    /// speed and shuts off electric assist.
    fn lock(&mut self);

    /// To unlocked-in-use, only from locked-available while available.
    fn unlock(&mut self) -> Result<(), FleetError>;

    /// To locked-broken from any state. Idempotent.
    fn mark_broken(&mut self);

    /// Clears the fault, back to locked-available.
    fn mark_repaired(&mut self);

    /// Always permitted; overwrites the position. Decorations may observe.
    fn update_location(&mut self, lat: f64, lon: f64);

    /// The undecorated bicycle at the bottom of the chain.
    fn base(&self) -> &Bicycle;
    fn base_mut(&mut self) -> &mut Bicycle;

    // Smart-lock operations.
    fn unlock_with_code(&mut self, _code: &str) -> Result<UnlockOutcome, FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no smart lock fitted",
            self.bicycle_id()
        )))
    }
    fn current_unlock_code(&self) -> Option<String> {
        None
    }
    fn reset_smart_lock(&mut self) -> Result<(), FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no smart lock fitted",
            self.bicycle_id()
        )))
    }
    fn set_smart_lock_enabled(&mut self, _enabled: bool) -> Result<(), FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no smart lock fitted",
            self.bicycle_id()
        )))
    }

    // GPS operations.
    fn set_gps_enabled(&mut self, _enabled: bool) -> Result<(), FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no GPS tracker fitted",
            self.bicycle_id()
        )))
    }
    fn last_gps_fix(&self) -> Option<Point> {
        None
    }

    // Anti-theft alarm operations.
    fn set_alarm_enabled(&mut self, _enabled: bool) -> Result<(), FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no anti-theft alarm fitted",
            self.bicycle_id()
        )))
    }
    fn reset_alarm(&mut self) -> Result<(), FleetError> {
        Err(FleetError::invalid_state(format!(
            "{} has no anti-theft alarm fitted",
            self.bicycle_id()
        )))
    }
    fn alarm_triggered(&self) -> bool {
        false
    }
}

impl BicycleOps for Bicycle {
    fn bicycle_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BicycleKind {
        self.kind
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn position(&self) -> Point {
        self.position
    }

    fn is_available(&self) -> bool {
        self.unavailability_reason().is_none()
    }

    fn lock(&mut self) {
        self.locked = true;
        self.in_use = false;
        self.speed = 0.0;
        if let Some(assist) = self.assist.as_mut() {
            assist.electric_mode = false;
        }
        log::info!("{} locked", self.id);
    }

    fn unlock(&mut self) -> Result<(), FleetError> {
        if let Some(reason) = self.unavailability_reason() {
            log::warn!("{} unlock refused: {}", self.id, reason);
            return Err(FleetError::invalid_state(format!(
                "{} unavailable: {}",
                self.id, reason
            )));
        }
        self.locked = false;
        self.in_use = true;
        log::info!("{} unlocked", self.id);
        Ok(())
    }

    fn mark_broken(&mut self) {
        self.broken = true;
        self.in_use = false;
        self.locked = true;
        self.speed = 0.0;
        if let Some(assist) = self.assist.as_mut() {
            assist.electric_mode = false;
        }
        log::warn!("{} marked broken", self.id);
    }

    fn mark_repaired(&mut self) {
        self.broken = false;
        self.locked = true;
        self.in_use = false;
        log::info!("{} repaired, back in service", self.id);
    }

    fn update_location(&mut self, lat: f64, lon: f64) {
        self.position = Point::new(lat, lon);
    }

    fn base(&self) -> &Bicycle {
        self
    }

    fn base_mut(&mut self) -> &mut Bicycle {
        self
    }
}
