#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::{Arc, Once};

use spoke::bicycle::Bicycle;
use spoke::config::FleetConfig;
use spoke::error::FleetError;
use spoke::fleet::Fleet;
use spoke::location;
use spoke::models::{BicycleKind, BicycleRecord, RentalRecord, RepairRecord, UserPlan, UserRecord};
use spoke::notify::{BicycleEvent, Observer};
use spoke::rental::RentalService;
use spoke::repair::RepairService;
use spoke::store::{MemoryStore, RecordStore};

static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

/// Create a test user record on the given plan
pub fn test_user(user_id: &str, plan: UserPlan) -> UserRecord {
    UserRecord {
        user_id: user_id.to_string(),
        password: "pw1234".to_string(),
        name: user_id.to_string(),
        user_type: plan,
        phone: "010-0000-0000".to_string(),
        email: format!("{}@example.com", user_id),
        is_admin: false,
        subscription_start_date: String::new(),
    }
}

/// Everything the integration tests need: a live fleet with two seeded
/// bicycles (REG001 at central-station, ELE001 at harbor), three seeded
/// users (alice: regular, bob: student, carol: premium), and in-memory
/// record stores.
pub struct Harness {
    pub fleet: Arc<Fleet>,
    pub users: Arc<MemoryStore<UserRecord>>,
    pub bicycles: Arc<MemoryStore<BicycleRecord>>,
    pub rentals: Arc<MemoryStore<RentalRecord>>,
    pub reports: Arc<MemoryStore<RepairRecord>>,
}

impl Harness {
    pub fn rental_service(&self) -> RentalService {
        RentalService::new(
            self.fleet.clone(),
            self.users.clone(),
            self.bicycles.clone(),
            self.rentals.clone(),
        )
    }

    pub fn repair_service(&self) -> Arc<RepairService> {
        RepairService::new(self.fleet.clone(), self.bicycles.clone(), self.reports.clone())
    }
}

pub fn seeded_harness() -> Harness {
    // Timer disabled by default; timer tests opt in with a short delay.
    seeded_harness_with(FleetConfig {
        auto_repair_delay_ms: 0,
        ..FleetConfig::default()
    })
}

pub fn seeded_harness_with(config: FleetConfig) -> Harness {
    let fleet = Arc::new(Fleet::new(config));

    fleet.add_bicycle(Bicycle::regular("REG001"));
    fleet.add_bicycle(Bicycle::electric("ELE001"));
    let central = location::coordinates("central-station").unwrap();
    let harbor = location::coordinates("harbor").unwrap();
    fleet.update_location("REG001", central.lat, central.lon).unwrap();
    fleet.update_location("ELE001", harbor.lat, harbor.lon).unwrap();

    let users = Arc::new(MemoryStore::new());
    users.upsert(test_user("alice", UserPlan::Regular)).unwrap();
    users.upsert(test_user("bob", UserPlan::Student)).unwrap();
    users.upsert(test_user("carol", UserPlan::Premium)).unwrap();

    let bicycles = Arc::new(MemoryStore::new());
    bicycles
        .upsert(BicycleRecord::parked("REG001", BicycleKind::Regular, "central-station"))
        .unwrap();
    bicycles
        .upsert(BicycleRecord::parked("ELE001", BicycleKind::Electric, "harbor"))
        .unwrap();

    Harness {
        fleet,
        users,
        bicycles,
        rentals: Arc::new(MemoryStore::new()),
        reports: Arc::new(MemoryStore::new()),
    }
}

/// Observer that records every delivered event for later assertions
pub struct RecordingObserver {
    name: String,
    events: Mutex<Vec<(BicycleEvent, String)>>,
}

impl RecordingObserver {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(RecordingObserver {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<(BicycleEvent, String)> {
        self.events.lock().clone()
    }

    pub fn count_of(&self, event: BicycleEvent) -> usize {
        self.events.lock().iter().filter(|(e, _)| *e == event).count()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, m)| m.contains(needle))
            .count()
    }
}

impl Observer for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(
        &self,
        _bicycle_id: &str,
        event: BicycleEvent,
        message: &str,
    ) -> Result<(), FleetError> {
        self.events.lock().push((event, message.to_string()));
        Ok(())
    }
}

/// Observer that always fails, for fan-out isolation tests
pub struct FailingObserver;

impl Observer for FailingObserver {
    fn name(&self) -> &str {
        "failing"
    }

    fn notify(
        &self,
        _bicycle_id: &str,
        _event: BicycleEvent,
        _message: &str,
    ) -> Result<(), FleetError> {
        Err(FleetError::invalid_state("observer offline"))
    }
}
