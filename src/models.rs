//! Record types and shared value types for the fleet engine.
//!
//! The four record structs mirror the flat-file store contract exactly:
//! camelCase column names, a header row, SCREAMING_SNAKE_CASE status values,
//! snake_case plan names. Open-ended fields (end time, admin stamps) are
//! empty strings while unset, matching the on-disk convention.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A position in lat/lon space. Distance math on these is planar, not
/// great-circle, throughout the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Self {
        Point { lat, lon }
    }

    /// Planar (Euclidean) displacement to another point, in lat/lon units.
    pub fn planar_distance(&self, other: &Point) -> f64 {
        let d_lat = other.lat - self.lat;
        let d_lon = other.lon - self.lon;
        (d_lat * d_lat + d_lon * d_lon).sqrt()
    }
}

/// Bicycle type as stored in the bicycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BicycleKind {
    Regular,
    Electric,
}

impl std::fmt::Display for BicycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BicycleKind::Regular => write!(f, "regular"),
            BicycleKind::Electric => write!(f, "electric"),
        }
    }
}

/// A user's active pricing plan, swappable at login or subscription change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserPlan {
    Regular,
    Student,
    Premium,
    RegularMonthly,
    ElectricMonthly,
}

impl UserPlan {
    /// Monthly plans carry a subscription start date in the user record.
    pub fn is_monthly(&self) -> bool {
        matches!(self, UserPlan::RegularMonthly | UserPlan::ElectricMonthly)
    }
}

/// Payment status of a rental record. PENDING until the rental completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Repair report status. Transitions are monotonic:
/// PENDING -> {APPROVED, REJECTED}; APPROVED -> FIXED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairStatus {
    Pending,
    Approved,
    Rejected,
    Fixed,
}

/// User record: `userId,password,name,userType,phone,email,isAdmin,subscriptionStartDate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub password: String,
    pub name: String,
    pub user_type: UserPlan,
    pub phone: String,
    pub email: String,
    pub is_admin: bool,
    /// Empty unless a monthly plan is active.
    pub subscription_start_date: String,
}

/// Bicycle record: `bicycleId,bicycleType,location,isAvailable,inUse,currentUser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BicycleRecord {
    pub bicycle_id: String,
    pub bicycle_type: BicycleKind,
    /// Named location where the bicycle is parked.
    pub location: String,
    pub is_available: bool,
    pub in_use: bool,
    /// Empty while nobody has the bicycle checked out.
    pub current_user: String,
}

impl BicycleRecord {
    pub fn parked(bicycle_id: impl Into<String>, kind: BicycleKind, location: impl Into<String>) -> Self {
        BicycleRecord {
            bicycle_id: bicycle_id.into(),
            bicycle_type: kind,
            location: location.into(),
            is_available: true,
            in_use: false,
            current_user: String::new(),
        }
    }
}

/// Rental record. Created open on rent, completed in place on return,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRecord {
    pub rental_id: String,
    pub user_id: String,
    pub bicycle_id: String,
    pub start_time: String,
    /// Empty while the rental is open.
    pub end_time: String,
    pub start_location: String,
    pub end_location: String,
    pub usage_minutes: f64,
    pub distance_km: f64,
    pub price: Decimal,
    pub payment_status: PaymentStatus,
}

impl RentalRecord {
    /// Creates an open record with a stamped start time.
    pub fn open(
        rental_id: impl Into<String>,
        user_id: impl Into<String>,
        bicycle_id: impl Into<String>,
        start_location: impl Into<String>,
    ) -> Self {
        RentalRecord {
            rental_id: rental_id.into(),
            user_id: user_id.into(),
            bicycle_id: bicycle_id.into(),
            start_time: now_rfc3339(),
            end_time: String::new(),
            start_location: start_location.into(),
            end_location: String::new(),
            usage_minutes: 0.0,
            distance_km: 0.0,
            price: Decimal::ZERO,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// An open rental has no recorded end time.
    pub fn is_open(&self) -> bool {
        self.end_time.is_empty()
    }

    /// Completes the rental: stamps the end, records usage and price, and
    /// marks payment settled.
    pub fn complete(&mut self, end_location: &str, usage_minutes: f64, distance_km: f64, price: Decimal) {
        self.end_time = now_rfc3339();
        self.end_location = end_location.to_string();
        self.usage_minutes = usage_minutes;
        self.distance_km = distance_km;
        self.price = price;
        self.payment_status = PaymentStatus::Paid;
    }
}

/// Repair report record:
/// `reportId,bicycleId,userId,description,reportTime,status,adminId,adminResponse,approvedTime,fixedTime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRecord {
    pub report_id: String,
    pub bicycle_id: String,
    pub user_id: String,
    pub description: String,
    pub report_time: String,
    pub status: RepairStatus,
    pub admin_id: String,
    pub admin_response: String,
    pub approved_time: String,
    pub fixed_time: String,
}

impl RepairRecord {
    /// Creates a PENDING report with a stamped report time.
    pub fn new(
        report_id: impl Into<String>,
        bicycle_id: impl Into<String>,
        user_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        RepairRecord {
            report_id: report_id.into(),
            bicycle_id: bicycle_id.into(),
            user_id: user_id.into(),
            description: description.into(),
            report_time: now_rfc3339(),
            status: RepairStatus::Pending,
            admin_id: String::new(),
            admin_response: String::new(),
            approved_time: String::new(),
            fixed_time: String::new(),
        }
    }
}

/// Current UTC time as an RFC 3339 string, the record timestamp format.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Generates a unique rental id.
pub fn new_rental_id() -> String {
    format!("RNT-{}", uuid::Uuid::new_v4())
}

/// Generates a unique repair report id.
pub fn new_report_id() -> String {
    format!("RPT-{}", uuid::Uuid::new_v4())
}
