//! Configuration management for the fleet engine.
//!
//! Configuration is loaded from environment variables with the SPOKE_ prefix,
//! falling back to defaults that match the reference deployment.
//!
//! # Environment Variables
//! - SPOKE_AUTO_REPAIR_DELAY_MS: Delay before an approved repair auto-completes (default: 60000, 0 disables)
//! - SPOKE_MOVEMENT_ALERT_THRESHOLD: Planar displacement that trips the anti-theft alarm (default: 0.05)
//! - SPOKE_MAX_UNLOCK_ATTEMPTS: Consecutive smart-lock failures before the lockout notice (default: 3)
//! - SPOKE_MONITOR_REPORT_EVERY: Monitor emits an aggregate report every Nth event (default: 10)
//! - SPOKE_ALERT_HISTORY_LIMIT: Admin alert history cap (default: 100)

use serde::Deserialize;
use std::env;

/// Prefix for all fleet engine environment variables.
const ENV_PREFIX: &str = "SPOKE_";

/// Tunable parameters for the fleet, capability, and repair subsystems.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Delay before an approved repair report auto-completes.
    /// Specified in milliseconds. Zero disables the background timer
    /// (completion then requires an explicit `complete` call).
    pub auto_repair_delay_ms: u64,

    /// Displacement that counts as unauthorized movement while a bicycle
    /// is parked. Planar units in lat/lon space (~50 m at this scale).
    pub movement_alert_threshold: f64,

    /// Consecutive failed smart-lock code entries before the soft-lockout
    /// notice is raised. Must be positive.
    pub max_unlock_attempts: u32,

    /// The system monitor emits an aggregate report every Nth event.
    /// Must be positive.
    pub monitor_report_every: u64,

    /// Maximum alert lines retained per admin notifier. Oldest entries are
    /// dropped first. Must be positive.
    pub alert_history_limit: usize,
}

impl FleetConfig {
    /// Attempts to load configuration from SPOKE_-prefixed environment
    /// variables.
    ///
    /// # Returns
    /// - Ok(config) if all present variables parse and validate
    /// - Err(message) describing the first problem otherwise
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists for local development
        dotenv::dotenv().ok();

        let env_vars: std::collections::HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .map(|(k, v)| (k.trim_start_matches(ENV_PREFIX).to_string(), v))
            .collect();

        match envy::from_iter::<_, Self>(env_vars.into_iter()) {
            Ok(config) => {
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(format!("Failed to parse environment variables: {}", e)),
        }
    }

    /// Loads configuration from the environment, falling back to defaults
    /// if variables are not set or are invalid.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_default()
    }

    /// Validates all parameters.
    ///
    /// # Returns
    /// - Ok(()) if everything is within range
    /// - Err(message) describing the first validation failure
    pub fn validate(&self) -> Result<(), String> {
        if self.movement_alert_threshold <= 0.0 {
            return Err("movement_alert_threshold must be positive".to_string());
        }
        if self.max_unlock_attempts == 0 {
            return Err("max_unlock_attempts must be positive".to_string());
        }
        if self.monitor_report_every == 0 {
            return Err("monitor_report_every must be positive".to_string());
        }
        if self.alert_history_limit == 0 {
            return Err("alert_history_limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Defaults matching the reference deployment.
impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            auto_repair_delay_ms: 60_000,  // one minute until auto-fix
            movement_alert_threshold: 0.05, // ~50 m in planar lat/lon units
            max_unlock_attempts: 3,
            monitor_report_every: 10,
            alert_history_limit: 100,
        }
    }
}
