//! Concurrency test: many threads issuing against one service.
//!
//! Validates that the check-and-insert is a single critical section and
//! that notifications stay exactly-once under contention.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use records_registry::{
    Fingerprint, InstitutionKey, JournalOptions, LedgerEvent, LedgerService,
    MemoryObserver, RecordId, RegistryError, SystemClock,
};

#[test]
fn stress_32_threads_race_for_one_record() {
    let owner = InstitutionKey::new(None).id();
    let service = Arc::new(LedgerService::ephemeral(owner, Arc::new(SystemClock)).unwrap());
    let observer = Arc::new(MemoryObserver::new());
    service.subscribe(observer.clone()).unwrap();

    let record_id = RecordId(Fingerprint::digest("contended"));
    let barrier = Arc::new(Barrier::new(32));
    let successes = Arc::new(AtomicUsize::new(0));
    let already = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            let already = Arc::clone(&already);
            thread::spawn(move || {
                barrier.wait();
                let hash = Fingerprint::digest(format!("hash-{i}"));
                match service.issue_record(&owner, record_id, hash) {
                    Ok(_) => successes.fetch_add(1, Ordering::SeqCst),
                    Err(RegistryError::AlreadyIssued(_)) => already.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("unexpected error: {e}"),
                };
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(already.load(Ordering::SeqCst), 31);
    assert_eq!(observer.len(), 1);

    // The stored hash is the one carried by the single notification.
    let stored = service.get_record_hash(&record_id).unwrap();
    match &observer.events()[0] {
        LedgerEvent::RecordIssued { record_hash, .. } => assert_eq!(*record_hash, stored),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn stress_16_writers_distinct_records_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let owner = InstitutionKey::new(None).id();
    let options = JournalOptions { sync_writes: false };
    let service =
        Arc::new(LedgerService::create(&path, owner, Arc::new(SystemClock), options).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = RecordId(Fingerprint::digest(format!("t{t}-r{i}")));
                    service
                        .issue_record(&owner, id, Fingerprint::digest(format!("h{t}-{i}")))
                        .expect("distinct ids must all succeed");
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(service.len().unwrap(), 800);
    drop(service);

    let reopened = LedgerService::open(&path, Arc::new(SystemClock), options).unwrap();
    assert_eq!(reopened.len().unwrap(), 800);
    assert_eq!(reopened.sequence().unwrap(), 801);
}

#[test]
fn stress_readers_alongside_writer() {
    let owner = InstitutionKey::new(None).id();
    let service = Arc::new(LedgerService::ephemeral(owner, Arc::new(SystemClock)).unwrap());
    let seeded = RecordId(Fingerprint::digest("seeded"));
    service
        .issue_record(&owner, seeded, Fingerprint::digest("seed-hash"))
        .unwrap();

    let writer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for i in 0..500 {
                let id = RecordId(Fingerprint::digest(format!("w{i}")));
                service
                    .issue_record(&owner, id, Fingerprint::digest(format!("wh{i}")))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..500 {
                    assert_eq!(
                        service.get_record_hash(&seeded).unwrap(),
                        Fingerprint::digest("seed-hash")
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(service.len().unwrap(), 501);
}

#[test]
fn stress_8_handles_race_on_one_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = Arc::new(dir.path().join("ledger.jsonl"));
    let owner = InstitutionKey::new(None).id();
    let options = JournalOptions { sync_writes: false };
    drop(LedgerService::create(&path, owner, Arc::new(SystemClock), options).unwrap());

    let record_id = RecordId(Fingerprint::digest("contended-across-handles"));
    let barrier = Arc::new(Barrier::new(8));

    // Each thread opens its own handle, as separate `srr issue` runs would.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let service = loop {
                    match LedgerService::open(&path, Arc::new(SystemClock), options) {
                        Ok(service) => break service,
                        Err(RegistryError::StorageError(_)) => {
                            thread::sleep(Duration::from_millis(1))
                        }
                        Err(e) => panic!("unexpected open error: {e}"),
                    }
                };
                service.issue_record(&owner, record_id, Fingerprint::digest(format!("h{i}")))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let issued: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(issued.len(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(RegistryError::AlreadyIssued(_)))));

    // The journal is still a valid chain holding exactly that one record.
    let reopened = LedgerService::open(&path, Arc::new(SystemClock), options).unwrap();
    assert_eq!(reopened.len().unwrap(), 1);
    match issued[0] {
        Ok(LedgerEvent::RecordIssued { record_hash, .. }) => {
            assert_eq!(reopened.get_record_hash(&record_id).unwrap(), *record_hash)
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn stress_snapshots_taken_during_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let owner = InstitutionKey::new(None).id();
    let options = JournalOptions { sync_writes: false };
    let writer =
        Arc::new(LedgerService::create(&path, owner, Arc::new(SystemClock), options).unwrap());

    let writing = {
        let writer = Arc::clone(&writer);
        thread::spawn(move || {
            for i in 0..300 {
                let id = RecordId(Fingerprint::digest(format!("s{i}")));
                writer
                    .issue_record(&owner, id, Fingerprint::digest(format!("sh{i}")))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let mut seen = 0;
                let mut file_len = 0;
                for _ in 0..100 {
                    let snapshot = LedgerService::open_read_only(&path)
                        .expect("snapshots never fail beside a live writer");
                    let len = snapshot.len().unwrap();
                    assert!(len >= seen, "a snapshot lost committed records");
                    seen = len;

                    let now = std::fs::metadata(&path).unwrap().len();
                    assert!(now >= file_len, "a reader shortened the journal");
                    file_len = now;
                }
            })
        })
        .collect();

    writing.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(writer.len().unwrap(), 300);
    drop(writer);
    let reopened = LedgerService::open(&path, Arc::new(SystemClock), options).unwrap();
    assert_eq!(reopened.len().unwrap(), 300);
}
