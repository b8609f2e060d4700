//! Durability test: crash recovery and tamper detection on the journal.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use records_registry::service::replay;
use records_registry::{
    Fingerprint, Identity, Journal, JournalEntry, JournalOptions, LedgerEvent, LedgerService,
    ManualClock, RecordId, RegistryError,
};

const T0: u64 = 1_700_000_000_000_000;

fn owner() -> Identity {
    Identity::from_bytes([0x21; 32])
}

fn fast() -> JournalOptions {
    JournalOptions { sync_writes: false }
}

fn populated(path: &Path, count: usize) -> LedgerService {
    let clock = Arc::new(ManualClock::new(T0));
    let service = LedgerService::create(path, owner(), clock.clone(), fast()).unwrap();
    for i in 0..count {
        clock.advance(10);
        service
            .issue_record(
                &owner(),
                RecordId(Fingerprint::digest(format!("record-{i}"))),
                Fingerprint::digest(format!("content-{i}")),
            )
            .unwrap();
    }
    service
}

fn reopen(path: &Path) -> records_registry::Result<LedgerService> {
    LedgerService::open(path, Arc::new(ManualClock::new(T0)), fast())
}

#[test]
fn stress_reopen_reproduces_1000_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let before = populated(&path, 1000).snapshot().unwrap();

    let after = reopen(&path).unwrap().snapshot().unwrap();
    assert_eq!(after.len(), 1000);
    assert_eq!(after, before);
}

#[test]
fn torn_tail_is_discarded_and_ledger_stays_writable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    drop(populated(&path, 5));
    let clean_len = std::fs::metadata(&path).unwrap().len();

    // Simulate a crash halfway through writing a sixth entry.
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();
    file.write_all(br#"{"seq":6,"event":{"type":"record_iss"#)
        .unwrap();
    drop(file);

    let service = reopen(&path).unwrap();
    assert_eq!(service.len().unwrap(), 5);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), clean_len);

    // The unacknowledged record was never issued and can be issued now.
    let id = RecordId(Fingerprint::digest("record-5"));
    assert!(matches!(
        service.get_record_hash(&id),
        Err(RegistryError::NotFound(_))
    ));
    service
        .issue_record(&owner(), id, Fingerprint::digest("content-5"))
        .unwrap();
    drop(service);

    assert_eq!(reopen(&path).unwrap().len().unwrap(), 6);
}

#[test]
fn snapshot_skips_in_flight_append_without_truncating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let writer = populated(&path, 3);

    // Half of an append that the writer has not finished yet.
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();
    file.write_all(br#"{"seq":4,"event":{"type":"record_issued","rec"#)
        .unwrap();
    drop(file);
    let len = std::fs::metadata(&path).unwrap().len();

    let snapshot = LedgerService::open_read_only(&path).unwrap();
    assert_eq!(snapshot.len().unwrap(), 3);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), len);

    // A second writer is refused instead of "recovering" the live tail.
    assert!(matches!(reopen(&path), Err(RegistryError::StorageError(_))));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    drop(writer);
}

#[test]
fn edited_record_hash_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    drop(populated(&path, 3));

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut entry: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
    entry["event"]["record_hash"] =
        serde_json::json!(Fingerprint::digest("forged transcript").to_string());
    lines[2] = serde_json::to_string(&entry).unwrap();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    match reopen(&path) {
        Err(RegistryError::CorruptJournal { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected corrupt journal, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn deleted_line_breaks_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    drop(populated(&path, 4));

    let text = std::fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = text
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, l)| l)
        .collect();
    std::fs::write(&path, kept.join("\n") + "\n").unwrap();

    assert!(matches!(
        reopen(&path),
        Err(RegistryError::CorruptJournal { .. })
    ));
}

#[test]
fn replay_rejects_events_that_break_ledger_rules() {
    let genesis = LedgerEvent::LedgerCreated {
        owner: owner(),
        created_at: T0,
    };
    let issue = |hash: &str, at: u64| LedgerEvent::RecordIssued {
        record_id: RecordId(Fingerprint::digest("same")),
        issuer: owner(),
        record_hash: Fingerprint::digest(hash),
        issued_at: at,
    };
    let entries: Vec<JournalEntry> = [genesis, issue("first", T0 + 1), issue("second", T0 + 2)]
        .into_iter()
        .enumerate()
        .map(|(seq, event)| JournalEntry {
            seq: seq as u64,
            event,
            checksum: String::new(),
        })
        .collect();

    assert_eq!(replay(&entries[..2]).unwrap().len(), 1);
    match replay(&entries) {
        Err(RegistryError::CorruptJournal { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected corrupt journal, got {:?}", other.map(|l| l.len())),
    }
}

#[test]
fn create_refuses_existing_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    drop(populated(&path, 1));

    let again = LedgerService::create(&path, owner(), Arc::new(ManualClock::new(T0)), fast());
    assert!(matches!(again, Err(RegistryError::StorageError(_))));
    assert_eq!(Journal::read_entries(&path).unwrap().len(), 2);
}
