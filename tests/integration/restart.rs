//! Integration test: auditor restart.
//!
//! Histories persisted in a Fjall store are re-verified on reopen and keep
//! serving clients as before.

use vouch_auditlog::{AuditLog, HistoryStore};
use vouch_integration_tests::{TestDirectory, lookup, new_client, registration};
use vouch_proto::{AuditingRequest, RequestKind};

fn reopen(path: &std::path::Path) -> AuditLog {
    AuditLog::open(HistoryStore::open(path).unwrap()).unwrap()
}

#[test]
fn test_histories_survive_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let mut a = TestDirectory::new(1);
    let mut b = TestDirectory::new(2);

    {
        let auditor = reopen(tmp.path());
        auditor.init_history("a.example", a.key(), &a.snapshots(0, 0)).unwrap();
        auditor.init_history("b.example", b.key(), &b.snapshots(0, 0)).unwrap();

        for _ in 0..3 {
            a.update();
            auditor.extend(&a.id(), &a.snapshots(a.epoch(), a.epoch())).unwrap();
        }
        b.update();
        auditor.extend(&b.id(), &b.snapshots(1, 1)).unwrap();
    }

    let auditor = reopen(tmp.path());
    let dirs = auditor.directories();
    assert_eq!(dirs.len(), 2);
    let summary_a = dirs.iter().find(|d| d.id == a.id()).unwrap();
    assert_eq!(summary_a.address, "a.example");
    assert_eq!(summary_a.latest_epoch, 3);

    assert_eq!(auditor.observed_range(&a.id(), 0, 3).unwrap(), a.snapshots(0, 3));
    assert_eq!(auditor.latest(&b.id()).unwrap(), *b.latest_snapshot());

    // Ingestion continues where it left off.
    a.update();
    auditor.extend(&a.id(), &a.snapshots(4, 4)).unwrap();
    drop(auditor);

    let auditor = reopen(tmp.path());
    assert_eq!(auditor.latest(&a.id()).unwrap().epoch, 4);
}

#[test]
fn test_client_cross_checks_reloaded_auditor() {
    let tmp = tempfile::tempdir().unwrap();
    let mut dir = TestDirectory::new(3);

    {
        let auditor = reopen(tmp.path());
        auditor.init_history("dir", dir.key(), &dir.snapshots(0, 0)).unwrap();
        dir.register(&registration("alice", b"k"));
        dir.update();
        auditor.audit_response(&dir.id(), &dir.history_response(1, 1)).unwrap();
    }

    let auditor = reopen(tmp.path());
    let mut client = new_client(&dir);
    client
        .handle_response(RequestKind::KeyLookup, &dir.lookup(&lookup("alice")), "alice", Some(b"k"))
        .unwrap();

    let audit = auditor.get_observed_strs(&AuditingRequest {
        directory_id: dir.id(),
        start_epoch: 0,
        end_epoch: 1,
    });
    client.check_equivocation(&audit).unwrap();
}

#[test]
fn test_duplicate_init_after_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = TestDirectory::new(4);

    {
        let auditor = reopen(tmp.path());
        auditor.init_history("dir", dir.key(), &dir.snapshots(0, 0)).unwrap();
    }

    let auditor = reopen(tmp.path());
    let err = auditor
        .init_history("dir", dir.key(), &dir.snapshots(0, 0))
        .unwrap_err();
    assert_eq!(err.status(), vouch_types::StatusCode::AlreadyExists);
}
