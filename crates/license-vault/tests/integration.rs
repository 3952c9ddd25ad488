//! End-to-end exercises of the sealed checkpoint store as an external caller
//! would use it: seal, reopen, tamper, and tolerate a single stale replica.

use license_vault::{CheckpointError, CheckpointStore};
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn store(dir: &std::path::Path) -> CheckpointStore {
    CheckpointStore::new(dir, &[11u8; 32], Duration::from_secs(1))
}

#[test]
fn checkpoint_survives_process_restart() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();

    {
        let store = store(dir.path());
        store.update_timestamps(now).expect("seal failed");
    }

    // A fresh `CheckpointStore` over the same directory, as if the process
    // restarted, must still see the sealed floor.
    let reopened = store(dir.path());
    let reading = reopened.validate_storage().expect("validate failed");
    assert_eq!(reading.agreeing_replicas, 3);
    assert!((reading.agreed_unix_time - now.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs_f64()).abs() < 1.0);
}

#[test]
fn ratcheting_forward_moves_the_floor() {
    let dir = tempdir().unwrap();
    let store = store(dir.path());

    let t0 = SystemTime::now();
    store.update_timestamps(t0).unwrap();
    let floor_a = store.validate_storage().unwrap().agreed_unix_time;

    let t1 = t0 + Duration::from_secs(3600);
    store.update_timestamps(t1).unwrap();
    let floor_b = store.validate_storage().unwrap().agreed_unix_time;

    assert!(floor_b > floor_a);
}

#[test]
fn two_of_three_agreement_tolerates_one_tampered_replica() {
    let dir = tempdir().unwrap();
    let store = store(dir.path());
    store.update_timestamps(SystemTime::now()).unwrap();

    // Hand-edit one of the three files, as a casual single-file attacker
    // might; the store must still validate on the remaining two.
    fs::write(dir.path().join("timestamp_3.dat"), b"tampered-garbage").unwrap();

    let reading = store.validate_storage().expect("2-of-3 agreement should still hold");
    assert_eq!(reading.agreeing_replicas, 2);
}

#[test]
fn wrong_secret_fails_closed_on_every_replica() {
    let dir = tempdir().unwrap();
    let sealer = store(dir.path());
    sealer.update_timestamps(SystemTime::now()).unwrap();

    let wrong_key_reader = CheckpointStore::new(dir.path(), &[99u8; 32], Duration::from_secs(1));
    assert!(matches!(
        wrong_key_reader.validate_storage(),
        Err(CheckpointError::InsufficientReplicas { readable: 0 })
    ));
}

#[test]
fn disagreement_beyond_tolerance_is_rejected() {
    let dir = tempdir().unwrap();
    let narrow = store(dir.path());
    narrow.update_timestamps(SystemTime::now()).unwrap();

    // Reseal just one replica far in the future, simulating a partially
    // applied multi-process write race.
    let drifted = CheckpointStore::new(dir.path(), &[11u8; 32], Duration::from_secs(1));
    let far_future = SystemTime::now() + Duration::from_secs(10_000);
    let tmp_dir = tempdir().unwrap();
    let staging = CheckpointStore::new(tmp_dir.path(), &[11u8; 32], Duration::from_secs(1));
    staging.update_timestamps(far_future).unwrap();
    fs::copy(tmp_dir.path().join("timestamp_1.dat"), dir.path().join("timestamp_1.dat")).unwrap();

    assert!(matches!(drifted.validate_storage(), Err(CheckpointError::Disagreement { .. })));
}
