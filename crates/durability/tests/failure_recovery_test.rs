//! Failure handling tests
//!
//! Commit failures propagate out of the call driving the chain, leave the
//! target untouched, and never wedge the serializer.

use snapcommit_durability::testing::{FaultKind, InstrumentedStorage};
use snapcommit_durability::{CommitConfig, CommitSerializer};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

fn setup() -> (TempDir, Arc<CommitSerializer<Arc<InstrumentedStorage>>>) {
    let temp_dir = TempDir::new().unwrap();
    let serializer = CommitSerializer::with_storage(
        temp_dir.path().join("db.json"),
        CommitConfig::fast(),
        Arc::new(InstrumentedStorage::new()),
    )
    .unwrap();
    (temp_dir, Arc::new(serializer))
}

#[test]
fn test_coalesced_failure_surfaces_in_driving_call() {
    let (_temp_dir, serializer) = setup();
    serializer.write("v0").unwrap();

    serializer.storage().inject(b"v2", FaultKind::FailWrite);
    serializer.storage().hold();
    let driver = {
        let serializer = Arc::clone(&serializer);
        thread::spawn(move || serializer.write("v1"))
    };
    assert!(serializer.storage().wait_until_blocked(BLOCK_TIMEOUT));

    // The caller that supplied v2 sees success; the failure belongs to the driver.
    serializer.write("v2").unwrap();
    serializer.storage().release();

    let err = driver.join().unwrap().unwrap_err();
    assert!(err.is_write_temp());
    assert_eq!(fs::read(serializer.path()).unwrap(), b"v1");
    assert!(!serializer.temp_path().exists());

    // Recovery: the caller re-writes current state.
    serializer.write("v2").unwrap();
    assert_eq!(fs::read(serializer.path()).unwrap(), b"v2");
}

#[test]
fn test_failure_discards_pending_payload() {
    let (_temp_dir, serializer) = setup();

    serializer.storage().inject(b"v1", FaultKind::FailRename);
    serializer.storage().hold();
    let driver = {
        let serializer = Arc::clone(&serializer);
        thread::spawn(move || serializer.write("v1"))
    };
    assert!(serializer.storage().wait_until_blocked(BLOCK_TIMEOUT));

    serializer.write("stale").unwrap();
    serializer.storage().release();
    assert!(driver.join().unwrap().unwrap_err().is_rename());

    // "stale" was dropped with the failed chain and must not resurface
    // after a newer idle write.
    serializer.write("fresh").unwrap();
    assert_eq!(
        serializer.storage().committed(),
        vec![b"fresh".to_vec()]
    );
    assert_eq!(fs::read(serializer.path()).unwrap(), b"fresh");
}

#[test]
fn test_repeated_failures_never_wedge() {
    let (_temp_dir, serializer) = setup();

    for i in 0..5 {
        let payload = format!("attempt-{i}");
        serializer
            .storage()
            .inject(payload.as_bytes(), FaultKind::FailWrite);
        assert!(serializer.write(payload).is_err());
    }

    serializer.write("ok").unwrap();
    assert_eq!(fs::read(serializer.path()).unwrap(), b"ok");
}

#[test]
fn test_missing_directory_is_created() {
    let temp_dir = TempDir::new().unwrap();
    let serializer = CommitSerializer::new(temp_dir.path().join("a").join("b").join("db.json"));

    serializer.write("v1").unwrap();
    assert_eq!(fs::read(serializer.path()).unwrap(), b"v1");
}

#[test]
fn test_unwritable_location_reports_write_temp() {
    let temp_dir = TempDir::new().unwrap();
    // A regular file where the parent directory should be.
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, b"").unwrap();
    let serializer = CommitSerializer::new(blocker.join("db.json"));

    let err = serializer.write("v1").unwrap_err();
    assert!(err.is_write_temp());
    assert_eq!(err.path(), serializer.temp_path());
}

#[test]
fn test_crash_leftover_temp_is_cleaned_and_overwritten() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("db.json");

    // Previous process: committed v1, then died mid-way through the next temp write.
    {
        let serializer = CommitSerializer::new(&target);
        serializer.write("v1").unwrap();
        fs::write(serializer.temp_path(), b"{\"half\":").unwrap();
    }

    let serializer = CommitSerializer::new(&target);
    assert_eq!(fs::read(&target).unwrap(), b"v1");
    assert!(serializer.remove_stale_temp().unwrap());

    serializer.write("v2").unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"v2");
}
