//! Static named-location directory.
//!
//! A fixed table of docking areas, each a name with representative
//! coordinates. Not a geofence: rent/return validate against the name, the
//! coordinates seed bicycle positions.

use crate::error::FleetError;
use crate::models::{BicycleRecord, Point};
use crate::store::RecordStore;

struct NamedLocation {
    name: &'static str,
    lat: f64,
    lon: f64,
}

const LOCATIONS: [NamedLocation; 5] = [
    NamedLocation { name: "central-station", lat: 37.3238, lon: 127.1069 },
    NamedLocation { name: "market-square", lat: 37.3195, lon: 127.1154 },
    NamedLocation { name: "university", lat: 37.2896, lon: 127.1139 },
    NamedLocation { name: "harbor", lat: 37.3089, lon: 127.1285 },
    NamedLocation { name: "old-town", lat: 37.2985, lon: 127.1234 },
];

/// All known location names, in directory order.
pub fn names() -> Vec<&'static str> {
    LOCATIONS.iter().map(|l| l.name).collect()
}

pub fn is_valid(name: &str) -> bool {
    LOCATIONS.iter().any(|l| l.name == name)
}

pub fn coordinates(name: &str) -> Option<Point> {
    LOCATIONS
        .iter()
        .find(|l| l.name == name)
        .map(|l| Point::new(l.lat, l.lon))
}

/// Ids of the bicycles currently recorded at a named location.
pub fn bicycles_at(
    store: &dyn RecordStore<BicycleRecord>,
    name: &str,
) -> Result<Vec<String>, FleetError> {
    if !is_valid(name) {
        return Err(FleetError::ValidationError(format!(
            "unknown location: {}",
            name
        )));
    }
    let rows = store.scan(&|b: &BicycleRecord| b.location == name)?;
    Ok(rows.into_iter().map(|b| b.bicycle_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_populated() {
        assert_eq!(names().len(), 5);
        assert!(is_valid("central-station"));
        assert!(!is_valid("nowhere"));
    }

    #[test]
    fn coordinates_resolve() {
        let point = coordinates("harbor").unwrap();
        assert!((point.lat - 37.3089).abs() < 1e-9);
        assert!(coordinates("nowhere").is_none());
    }
}
