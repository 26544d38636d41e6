//! Rental transaction manager: orchestrates rent/return against the
//! bicycle state machine, the pricing resolver, and the notification
//! subject, and writes rental records.
//!
//! Every precondition is checked before any mutation; a persist failure
//! mid-transaction compensates the in-memory change before surfacing the
//! error, so a caller never observes a half-rented bicycle.

use rust_decimal::Decimal;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::error::FleetError;
use crate::fleet::Fleet;
use crate::location;
use crate::models::{new_rental_id, BicycleRecord, Point, RentalRecord, UserPlan, UserRecord};
use crate::pricing;
use crate::store::RecordStore;

/// Success payload of `rent`.
#[derive(Debug, Clone)]
pub struct RentalReceipt {
    pub rental_id: String,
    pub bicycle_id: String,
    pub location: String,
    pub start_time: String,
}

/// Success payload of `return_bicycle`.
#[derive(Debug, Clone)]
pub struct ReturnReceipt {
    pub rental_id: String,
    pub bicycle_id: String,
    pub end_location: String,
    pub usage_minutes: f64,
    pub distance_km: f64,
    pub price: Decimal,
    pub strategy: &'static str,
}

pub struct RentalService {
    fleet: Arc<Fleet>,
    users: Arc<dyn RecordStore<UserRecord>>,
    bicycles: Arc<dyn RecordStore<BicycleRecord>>,
    rentals: Arc<dyn RecordStore<RentalRecord>>,
}

impl RentalService {
    pub fn new(
        fleet: Arc<Fleet>,
        users: Arc<dyn RecordStore<UserRecord>>,
        bicycles: Arc<dyn RecordStore<BicycleRecord>>,
        rentals: Arc<dyn RecordStore<RentalRecord>>,
    ) -> Self {
        RentalService {
            fleet,
            users,
            bicycles,
            rentals,
        }
    }

    /// Rents a bicycle to a user at a named location.
    ///
    /// Preconditions: the user and bicycle exist, the bicycle is recorded
    /// at `location_name`, it has no open rental, and it is available both
    /// in the fleet and on record. On success an open rental record exists,
    /// the bicycle is unlocked and in use, and a RENT event has fanned out.
    pub fn rent(
        &self,
        user_id: &str,
        bicycle_id: &str,
        location_name: &str,
    ) -> Result<RentalReceipt, FleetError> {
        self.users
            .get(user_id)?
            .ok_or_else(|| FleetError::not_found(format!("user {}", user_id)))?;
        if !location::is_valid(location_name) {
            return Err(FleetError::ValidationError(format!(
                "unknown location: {}",
                location_name
            )));
        }
        let mut record = self
            .bicycles
            .get(bicycle_id)?
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        if record.location != location_name {
            return Err(FleetError::ValidationError(format!(
                "{} is not at {}",
                bicycle_id, location_name
            )));
        }
        if !self.open_rentals_for_bicycle(bicycle_id)?.is_empty() {
            return Err(FleetError::invalid_state(format!(
                "{} already has an open rental",
                bicycle_id
            )));
        }
        if !record.is_available || record.in_use || !self.fleet.is_available(bicycle_id)? {
            return Err(FleetError::invalid_state(format!(
                "{} is not available",
                bicycle_id
            )));
        }

        // Preconditions hold; mutate, compensating on persist failure.
        self.fleet.unlock(bicycle_id)?;

        let parked = record.clone();
        record.is_available = false;
        record.in_use = true;
        record.current_user = user_id.to_string();
        if let Err(e) = self.bicycles.upsert(record) {
            self.relock_after_failure(bicycle_id);
            return Err(e);
        }

        let rental = RentalRecord::open(new_rental_id(), user_id, bicycle_id, location_name);
        let receipt = RentalReceipt {
            rental_id: rental.rental_id.clone(),
            bicycle_id: bicycle_id.to_string(),
            location: location_name.to_string(),
            start_time: rental.start_time.clone(),
        };
        if let Err(e) = self.rentals.upsert(rental) {
            self.relock_after_failure(bicycle_id);
            // The bicycle record was already persisted as checked out;
            // put the parked version back.
            if let Err(e2) = self.bicycles.upsert(parked) {
                log::error!(
                    "failed to restore bicycle record for {} after aborted rent: {}",
                    bicycle_id,
                    e2
                );
            }
            return Err(e);
        }

        if let Some(subject) = self.fleet.subject(bicycle_id) {
            subject.rented(user_id);
        }
        log::info!("{} rented {} at {}", user_id, bicycle_id, location_name);
        Ok(receipt)
    }

    /// Returns a rented bicycle, pricing the trip under the renter's
    /// active plan.
    ///
    /// Precondition: exactly one open rental exists for (user, bicycle).
    /// On success the rental record is completed and PAID, the bicycle is
    /// locked, relocated, available again, and a RETURN event carrying the
    /// usage duration has fanned out.
    pub fn return_bicycle(
        &self,
        user_id: &str,
        bicycle_id: &str,
        end_location: &str,
        usage_minutes: f64,
        distance_km: f64,
    ) -> Result<ReturnReceipt, FleetError> {
        let mut record = self
            .bicycles
            .get(bicycle_id)?
            .ok_or_else(|| FleetError::not_found(format!("bicycle {}", bicycle_id)))?;
        if !location::is_valid(end_location) {
            return Err(FleetError::ValidationError(format!(
                "unknown location: {}",
                end_location
            )));
        }
        let user = self
            .users
            .get(user_id)?
            .ok_or_else(|| FleetError::not_found(format!("user {}", user_id)))?;
        let mut rental = self
            .rentals
            .scan(&|r: &RentalRecord| {
                r.user_id == user_id && r.bicycle_id == bicycle_id && r.is_open()
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                FleetError::invalid_state(format!(
                    "{} has nothing to return on {}",
                    user_id, bicycle_id
                ))
            })?;

        let strategy = user.user_type.strategy();
        let price = strategy.price(usage_minutes, distance_km);
        let open_rental = rental.clone();
        let ride_position = self.fleet.position(bicycle_id)?;

        // Relocate before locking: the anti-theft alarm must see the move
        // as the rider's, not as unauthorized parked movement.
        if let Some(point) = location::coordinates(end_location) {
            self.fleet.update_location(bicycle_id, point.lat, point.lon)?;
        }
        self.fleet.lock(bicycle_id)?;

        rental.complete(end_location, usage_minutes, distance_km, price);
        let receipt = ReturnReceipt {
            rental_id: rental.rental_id.clone(),
            bicycle_id: bicycle_id.to_string(),
            end_location: end_location.to_string(),
            usage_minutes,
            distance_km,
            price,
            strategy: strategy.name(),
        };
        if let Err(e) = self.rentals.upsert(rental) {
            self.reopen_after_failure(bicycle_id, ride_position);
            return Err(e);
        }

        record.is_available = self.fleet.is_available(bicycle_id)?;
        record.in_use = false;
        record.current_user.clear();
        record.location = end_location.to_string();
        if let Err(e) = self.bicycles.upsert(record) {
            self.reopen_after_failure(bicycle_id, ride_position);
            // The completed rental was already persisted; reopen it so the
            // return can be retried.
            if let Err(e2) = self.rentals.upsert(open_rental) {
                log::error!(
                    "failed to reopen rental for {} after aborted return: {}",
                    bicycle_id,
                    e2
                );
            }
            return Err(e);
        }

        if let Some(subject) = self.fleet.subject(bicycle_id) {
            subject.returned(user_id, usage_minutes);
        }
        log::info!(
            "{} returned {} at {} ({} min, {})",
            user_id,
            bicycle_id,
            end_location,
            usage_minutes,
            price
        );
        Ok(receipt)
    }

    /// Switches a user's pricing plan. Monthly plans stamp the subscription
    /// start date; any other plan clears it.
    pub fn subscribe(&self, user_id: &str, plan: UserPlan) -> Result<(), FleetError> {
        let mut user = self
            .users
            .get(user_id)?
            .ok_or_else(|| FleetError::not_found(format!("user {}", user_id)))?;
        user.user_type = plan;
        user.subscription_start_date = if plan.is_monthly() {
            OffsetDateTime::now_utc().date().to_string()
        } else {
            String::new()
        };
        self.users.upsert(user)?;
        log::info!("{} switched to plan {:?}", user_id, plan);
        Ok(())
    }

    /// Prices one trip under every strategy, for plan comparison at the
    /// boundary.
    pub fn quote_all(&self, usage_minutes: f64, distance_km: f64) -> Vec<(&'static str, Decimal)> {
        pricing::quote_all(usage_minutes, distance_km)
    }

    pub fn rentals_for_user(&self, user_id: &str) -> Result<Vec<RentalRecord>, FleetError> {
        self.rentals.scan(&|r: &RentalRecord| r.user_id == user_id)
    }

    fn open_rentals_for_bicycle(&self, bicycle_id: &str) -> Result<Vec<RentalRecord>, FleetError> {
        self.rentals
            .scan(&|r: &RentalRecord| r.bicycle_id == bicycle_id && r.is_open())
    }

    /// Best-effort compensation when a persist fails after the in-memory
    /// unlock.
    fn relock_after_failure(&self, bicycle_id: &str) {
        if let Err(e) = self.fleet.lock(bicycle_id) {
            log::error!("failed to relock {} after aborted rent: {}", bicycle_id, e);
        }
    }

    /// Best-effort compensation when a persist fails mid-return: puts the
    /// bicycle back in use at its pre-return position, so the rental stays
    /// open and returnable. Unlock first; moving a parked bicycle would
    /// trip the anti-theft alarm.
    fn reopen_after_failure(&self, bicycle_id: &str, position: Point) {
        if let Err(e) = self.fleet.unlock(bicycle_id) {
            log::error!("failed to reopen {} after aborted return: {}", bicycle_id, e);
            return;
        }
        if let Err(e) = self.fleet.update_location(bicycle_id, position.lat, position.lon) {
            log::error!("failed to restore position of {}: {}", bicycle_id, e);
        }
    }
}
