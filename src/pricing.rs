//! Pricing resolution: a pure function of usage minutes (and, nominally,
//! distance) per named strategy.
//!
//! All monetary arithmetic uses exact decimals; binary floating point never
//! touches a price. Distance is accepted by every strategy and currently
//! priced by none of them — time-based billing is the reference behavior
//! and is preserved as-is (see DESIGN.md).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::UserPlan;

/// A stateless, named pricing policy.
pub trait PricingStrategy: Send + Sync {
    /// Computes the price for a completed rental. The caller supplies
    /// elapsed minutes and traveled distance; nothing is measured here.
    fn price(&self, usage_minutes: f64, distance_km: f64) -> Decimal;

    fn name(&self) -> &'static str;

    /// The recurring fee for subscription strategies, if any. Informational
    /// only; it is billed outside this engine.
    fn monthly_fee(&self) -> Option<Decimal> {
        None
    }
}

fn minutes(usage_minutes: f64) -> Decimal {
    Decimal::from_f64_retain(usage_minutes).unwrap_or_default()
}

/// Base fare plus a per-minute rate from the first minute.
pub struct PayPerUse;

impl PricingStrategy for PayPerUse {
    fn price(&self, usage_minutes: f64, _distance_km: f64) -> Decimal {
        dec!(2000) + minutes(usage_minutes) * dec!(100)
    }

    fn name(&self) -> &'static str {
        "pay-per-use"
    }
}

/// Discounted pay-per-use for students: half rate, half base fare.
pub struct StudentRate;

impl PricingStrategy for StudentRate {
    fn price(&self, usage_minutes: f64, _distance_km: f64) -> Decimal {
        dec!(1000) + minutes(usage_minutes) * dec!(50)
    }

    fn name(&self) -> &'static str {
        "student"
    }
}

/// Premium membership: the first 60 minutes are free, then metered.
pub struct PremiumTier;

impl PricingStrategy for PremiumTier {
    fn price(&self, usage_minutes: f64, _distance_km: f64) -> Decimal {
        metered_beyond_free(usage_minutes, 60.0, dec!(150))
    }

    fn name(&self) -> &'static str {
        "premium"
    }

    fn monthly_fee(&self) -> Option<Decimal> {
        Some(dec!(20000))
    }
}

/// Regular monthly subscription: 60 free minutes per day, then metered.
pub struct RegularMonthly;

impl PricingStrategy for RegularMonthly {
    fn price(&self, usage_minutes: f64, _distance_km: f64) -> Decimal {
        metered_beyond_free(usage_minutes, 60.0, dec!(100))
    }

    fn name(&self) -> &'static str {
        "regular-monthly"
    }

    fn monthly_fee(&self) -> Option<Decimal> {
        Some(dec!(15000))
    }
}

/// Electric monthly subscription: 45 free minutes per day, then metered at
/// the electric rate.
pub struct ElectricMonthly;

impl PricingStrategy for ElectricMonthly {
    fn price(&self, usage_minutes: f64, _distance_km: f64) -> Decimal {
        metered_beyond_free(usage_minutes, 45.0, dec!(150))
    }

    fn name(&self) -> &'static str {
        "electric-monthly"
    }

    fn monthly_fee(&self) -> Option<Decimal> {
        Some(dec!(25000))
    }
}

fn metered_beyond_free(usage_minutes: f64, free_minutes: f64, rate: Decimal) -> Decimal {
    if usage_minutes <= free_minutes {
        return Decimal::ZERO;
    }
    minutes(usage_minutes - free_minutes) * rate
}

impl UserPlan {
    /// The pricing strategy active for this plan.
    pub fn strategy(&self) -> Box<dyn PricingStrategy> {
        match self {
            UserPlan::Regular => Box::new(PayPerUse),
            UserPlan::Student => Box::new(StudentRate),
            UserPlan::Premium => Box::new(PremiumTier),
            UserPlan::RegularMonthly => Box::new(RegularMonthly),
            UserPlan::ElectricMonthly => Box::new(ElectricMonthly),
        }
    }
}

/// Prices one trip under every strategy, in a stable order. Backs the
/// compare-plans operation exposed to the boundary.
pub fn quote_all(usage_minutes: f64, distance_km: f64) -> Vec<(&'static str, Decimal)> {
    let strategies: [Box<dyn PricingStrategy>; 5] = [
        Box::new(PayPerUse),
        Box::new(StudentRate),
        Box::new(PremiumTier),
        Box::new(RegularMonthly),
        Box::new(ElectricMonthly),
    ];
    strategies
        .iter()
        .map(|s| (s.name(), s.price(usage_minutes, distance_km)))
        .collect()
}
