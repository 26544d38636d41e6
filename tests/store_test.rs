mod common;

use common::{init, test_user};
use std::path::PathBuf;

use spoke::location;
use spoke::models::{BicycleKind, BicycleRecord, UserPlan, UserRecord};
use spoke::store::{CsvStore, MemoryStore, RecordStore};

fn temp_csv(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spoke-{}-{}.csv", name, uuid::Uuid::new_v4()))
}

#[test]
fn missing_file_is_an_empty_store() {
    init();
    let store: CsvStore<UserRecord> = CsvStore::new(temp_csv("users"));
    assert!(store.get("alice").unwrap().is_none());
    assert!(store.scan(&|_| true).unwrap().is_empty());
}

#[test]
fn csv_upsert_replaces_by_key() {
    init();
    let path = temp_csv("users");
    let store: CsvStore<UserRecord> = CsvStore::new(&path);

    store.upsert(test_user("alice", UserPlan::Regular)).unwrap();
    store.upsert(test_user("bob", UserPlan::Student)).unwrap();

    let mut alice = store.get("alice").unwrap().unwrap();
    alice.user_type = UserPlan::Premium;
    store.upsert(alice).unwrap();

    // Replaced in place, not appended.
    assert_eq!(store.scan(&|_| true).unwrap().len(), 2);
    assert_eq!(store.get("alice").unwrap().unwrap().user_type, UserPlan::Premium);
    assert_eq!(store.get("bob").unwrap().unwrap().user_type, UserPlan::Student);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn csv_rows_survive_reopen() {
    init();
    let path = temp_csv("bicycles");
    {
        let store: CsvStore<BicycleRecord> = CsvStore::new(&path);
        store
            .upsert(BicycleRecord::parked("REG001", BicycleKind::Regular, "central-station"))
            .unwrap();
        store
            .upsert(BicycleRecord::parked("ELE001", BicycleKind::Electric, "harbor"))
            .unwrap();
    }

    let reopened: CsvStore<BicycleRecord> = CsvStore::new(&path);
    let record = reopened.get("ELE001").unwrap().unwrap();
    assert_eq!(record.bicycle_type, BicycleKind::Electric);
    assert_eq!(record.location, "harbor");
    assert_eq!(reopened.scan(&|_| true).unwrap().len(), 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn csv_preserves_empty_string_fields() {
    init();
    let path = temp_csv("bicycles");
    let store: CsvStore<BicycleRecord> = CsvStore::new(&path);
    store
        .upsert(BicycleRecord::parked("REG001", BicycleKind::Regular, "central-station"))
        .unwrap();

    let record = store.get("REG001").unwrap().unwrap();
    assert!(record.current_user.is_empty());
    assert!(record.is_available);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn memory_store_preserves_insertion_order() {
    init();
    let store = MemoryStore::new();
    for id in ["c-1", "a-2", "b-3"] {
        store.upsert(test_user(id, UserPlan::Regular)).unwrap();
    }

    // Updating a row must not reorder the scan.
    let mut mid = store.get("a-2").unwrap().unwrap();
    mid.user_type = UserPlan::Student;
    store.upsert(mid).unwrap();

    let ids: Vec<String> = store
        .scan(&|_| true)
        .unwrap()
        .into_iter()
        .map(|u: UserRecord| u.user_id)
        .collect();
    assert_eq!(ids, ["c-1", "a-2", "b-3"]);
}

#[test]
fn bicycles_at_scans_by_location() {
    init();
    let store = MemoryStore::new();
    store
        .upsert(BicycleRecord::parked("REG001", BicycleKind::Regular, "central-station"))
        .unwrap();
    store
        .upsert(BicycleRecord::parked("REG002", BicycleKind::Regular, "central-station"))
        .unwrap();
    store
        .upsert(BicycleRecord::parked("ELE001", BicycleKind::Electric, "harbor"))
        .unwrap();

    let at_central = location::bicycles_at(&store, "central-station").unwrap();
    assert_eq!(at_central, ["REG001", "REG002"]);
    assert!(location::bicycles_at(&store, "old-town").unwrap().is_empty());
    assert!(location::bicycles_at(&store, "nowhere").is_err());
}
