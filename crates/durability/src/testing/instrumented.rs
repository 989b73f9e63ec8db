//! Instrumented commit storage
//!
//! Wraps [`LocalFs`] (without fsync) and observes every commit. A commit
//! starts at `write_file` and ends when `replace` returns or either step
//! fails; the storage tracks how many commits overlap so tests can assert
//! mutual exclusion directly.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use snapcommit_core::CommitStorage;

use crate::config::SyncMode;
use crate::local_fs::LocalFs;

/// Fault to trigger when a specific payload is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Write half of the payload to the temp file, then fail
    FailWrite,
    /// Write the temp file, then fail the rename
    FailRename,
    /// Panic inside `write_file`
    Panic,
}

#[derive(Debug, Default)]
struct Gate {
    closed: bool,
    blocked: usize,
}

#[derive(Debug, Default)]
struct Journal {
    /// Payload currently between write and rename
    staged: Option<Vec<u8>>,
    /// Payloads that were renamed onto the target, in order
    committed: Vec<Vec<u8>>,
}

/// Local storage with gates, delays, fault injection and a commit journal
#[derive(Debug)]
pub struct InstrumentedStorage {
    inner: LocalFs,
    gate: Mutex<Gate>,
    gate_changed: Condvar,
    delay: Mutex<Option<Duration>>,
    faults: Mutex<Vec<(Vec<u8>, FaultKind)>>,
    journal: Mutex<Journal>,
    write_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for InstrumentedStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentedStorage {
    /// Create an open-gated, fault-free instance
    pub fn new() -> Self {
        InstrumentedStorage {
            inner: LocalFs::new(SyncMode::None),
            gate: Mutex::new(Gate::default()),
            gate_changed: Condvar::new(),
            delay: Mutex::new(None),
            faults: Mutex::new(Vec::new()),
            journal: Mutex::new(Journal::default()),
            write_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Close the gate: subsequent `write_file` calls block until [`release`](Self::release)
    pub fn hold(&self) {
        self.gate.lock().closed = true;
    }

    /// Open the gate and wake blocked commits
    pub fn release(&self) {
        let mut gate = self.gate.lock();
        gate.closed = false;
        self.gate_changed.notify_all();
    }

    /// Wait until a commit is blocked at the gate
    ///
    /// Returns false if none arrived within `timeout`.
    pub fn wait_until_blocked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock();
        while gate.blocked == 0 {
            if self.gate_changed.wait_until(&mut gate, deadline).timed_out() {
                return gate.blocked > 0;
            }
        }
        true
    }

    /// Sleep for `delay` between writing the first and second half of each temp file
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Trigger `kind` the next time `payload` is committed (one shot)
    pub fn inject(&self, payload: &[u8], kind: FaultKind) {
        self.faults.lock().push((payload.to_vec(), kind));
    }

    /// Payloads renamed onto the target, oldest first
    pub fn committed(&self) -> Vec<Vec<u8>> {
        self.journal.lock().committed.clone()
    }

    /// Number of `write_file` calls, successful or not
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::Acquire)
    }

    /// Highest number of commits ever observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }

    fn take_fault(&self, payload: &[u8], kind: FaultKind) -> bool {
        let mut faults = self.faults.lock();
        match faults.iter().position(|(p, k)| p == payload && *k == kind) {
            Some(index) => {
                faults.remove(index);
                true
            }
            None => false,
        }
    }

    fn begin_commit(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(running, Ordering::AcqRel);
    }

    fn end_commit(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn wait_at_gate(&self) {
        let mut gate = self.gate.lock();
        if !gate.closed {
            return;
        }
        gate.blocked += 1;
        self.gate_changed.notify_all();
        while gate.closed {
            self.gate_changed.wait(&mut gate);
        }
        gate.blocked -= 1;
    }
}

impl CommitStorage for InstrumentedStorage {
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.write_calls.fetch_add(1, Ordering::AcqRel);
        self.begin_commit();
        self.wait_at_gate();

        if self.take_fault(bytes, FaultKind::Panic) {
            self.end_commit();
            panic!("injected panic while writing {}", path.display());
        }

        if self.take_fault(bytes, FaultKind::FailWrite) {
            let _ = self.inner.write_file(path, &bytes[..bytes.len() / 2]);
            self.end_commit();
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        let delay = *self.delay.lock();
        let result = match delay {
            // Split the write so a slow commit has a half-written temp file.
            Some(delay) => {
                let (head, _) = bytes.split_at(bytes.len() / 2);
                self.inner.write_file(path, head).and_then(|()| {
                    std::thread::sleep(delay);
                    self.inner.write_file(path, bytes)
                })
            }
            None => self.inner.write_file(path, bytes),
        };

        match result {
            Ok(()) => {
                self.journal.lock().staged = Some(bytes.to_vec());
                Ok(())
            }
            Err(e) => {
                self.end_commit();
                Err(e)
            }
        }
    }

    fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        let staged = self.journal.lock().staged.take().unwrap_or_default();

        if self.take_fault(&staged, FaultKind::FailRename) {
            self.end_commit();
            return Err(io::Error::new(io::ErrorKind::Other, "injected rename failure"));
        }

        let result = self.inner.replace(from, to);
        if result.is_ok() {
            self.journal.lock().committed.push(staged);
        }
        self.end_commit();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_journal_records_renames() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = InstrumentedStorage::new();
        let temp = temp_dir.path().join("db.temp");
        let target = temp_dir.path().join("db");

        storage.write_file(&temp, b"v1").unwrap();
        storage.replace(&temp, &target).unwrap();

        assert_eq!(storage.committed(), vec![b"v1".to_vec()]);
        assert_eq!(storage.write_calls(), 1);
        assert_eq!(storage.max_in_flight(), 1);
    }

    #[test]
    fn test_fault_is_one_shot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = InstrumentedStorage::new();
        let temp = temp_dir.path().join("db.temp");
        storage.inject(b"v1", FaultKind::FailWrite);

        assert!(storage.write_file(&temp, b"v1").is_err());
        assert!(storage.write_file(&temp, b"v1").is_ok());
    }

    #[test]
    fn test_failed_write_leaves_partial_temp() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = InstrumentedStorage::new();
        let temp = temp_dir.path().join("db.temp");
        storage.inject(b"abcdef", FaultKind::FailWrite);

        assert!(storage.write_file(&temp, b"abcdef").is_err());
        assert_eq!(fs::read(&temp).unwrap(), b"abc");
    }

    #[test]
    fn test_gate_blocks_until_release() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(InstrumentedStorage::new());
        let temp = temp_dir.path().join("db.temp");
        storage.hold();

        let writer = {
            let storage = Arc::clone(&storage);
            let temp = temp.clone();
            thread::spawn(move || storage.write_file(&temp, b"v1"))
        };

        assert!(storage.wait_until_blocked(Duration::from_secs(5)));
        assert!(!temp.exists());

        storage.release();
        writer.join().unwrap().unwrap();
        assert_eq!(fs::read(&temp).unwrap(), b"v1");
    }

    #[test]
    fn test_wait_until_blocked_times_out() {
        let storage = InstrumentedStorage::new();
        assert!(!storage.wait_until_blocked(Duration::from_millis(10)));
    }
}
