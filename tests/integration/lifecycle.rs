//! Integration test: honest directory lifecycle.
//!
//! A directory, an auditor and several clients agree on one history.

use vouch_auditlog::AuditLog;
use vouch_client::CheckerState;
use vouch_integration_tests::{TestDirectory, lookup, new_client, registration};
use vouch_proto::{AuditingRequest, RequestKind};
use vouch_types::StatusCode;

fn audit_request(dir: &TestDirectory, start: u64, end: u64) -> AuditingRequest {
    AuditingRequest {
        directory_id: dir.id(),
        start_epoch: start,
        end_epoch: end,
    }
}

/// Register at epoch 0, look up at epoch 1, cross-check with the auditor.
#[test]
fn test_register_lookup_audit() {
    let mut dir = TestDirectory::new(1);
    let auditor = AuditLog::new();
    let id = auditor
        .init_history("dir.example:443", dir.key(), &dir.snapshots(0, 0))
        .unwrap();
    assert_eq!(id, dir.id());

    let mut registrar = new_client(&dir);
    let mut looker1 = new_client(&dir);
    let mut looker2 = new_client(&dir);

    let resp = dir.register(&registration("alice", b"key1"));
    let got = registrar
        .handle_response(RequestKind::Registration, &resp, "alice", Some(b"key1"))
        .unwrap();
    assert_eq!(got.as_deref(), Some(&b"key1"[..]));

    dir.update();

    let key1 = looker1
        .handle_response(RequestKind::KeyLookup, &dir.lookup(&lookup("alice")), "alice", None)
        .unwrap();
    let key2 = looker2
        .handle_response(RequestKind::KeyLookup, &dir.lookup(&lookup("alice")), "alice", None)
        .unwrap();
    assert_eq!(key1.as_deref(), Some(&b"key1"[..]));
    assert_eq!(key1, key2);

    // Auditor receives the latest update.
    auditor.audit_response(&id, &dir.history_response(1, 1)).unwrap();

    let audit = auditor.get_observed_strs(&audit_request(&dir, 1, 1));
    assert_eq!(audit.status, StatusCode::Ok);
    looker1.check_equivocation(&audit).unwrap();
    looker2.check_equivocation(&audit).unwrap();

    // The registrar's promise is fulfilled on its next lookup.
    assert!(registrar.outstanding_promise("alice").is_some());
    registrar
        .handle_response(RequestKind::KeyLookup, &dir.lookup(&lookup("alice")), "alice", Some(b"key1"))
        .unwrap();
    assert!(registrar.outstanding_promise("alice").is_none());
    registrar.check_equivocation(&audit).unwrap();
}

/// Many epochs, several names, clients that catch up in one response.
#[test]
fn test_long_history_with_lagging_client() {
    let mut dir = TestDirectory::new(2);
    let auditor = AuditLog::new();
    let id = auditor
        .init_history("dir", dir.key(), &dir.snapshots(0, 0))
        .unwrap();

    let mut active = new_client(&dir);
    let mut lagging = new_client(&dir);

    for (i, name) in ["alice", "bob", "carol", "dave"].iter().enumerate() {
        let key = format!("key-{i}");
        let resp = dir.register(&registration(name, key.as_bytes()));
        active
            .handle_response(RequestKind::Registration, &resp, name, Some(key.as_bytes()))
            .unwrap();

        dir.update();
        auditor.extend(&id, &dir.snapshots(dir.epoch(), dir.epoch())).unwrap();

        let got = active
            .handle_response(RequestKind::KeyLookup, &dir.lookup(&lookup(name)), name, None)
            .unwrap();
        assert_eq!(got, Some(key.into_bytes()));
    }
    assert_eq!(dir.epoch(), 4);

    // The lagging client jumps from epoch 0 to 4 via the bridging snapshots.
    let got = lagging
        .handle_response(RequestKind::KeyLookup, &dir.lookup_since(0), "carol", None)
        .unwrap();
    assert_eq!(got.as_deref(), Some(&b"key-2"[..]));
    assert_eq!(lagging.latest().unwrap().epoch, 4);
    assert_eq!(lagging.state(), CheckerState::Tracking);

    // Full, partial and single-epoch audits all agree.
    for (start, end) in [(0, 4), (2, 3), (4, 4), (0, 0)] {
        let audit = auditor.get_observed_strs(&audit_request(&dir, start, end));
        active.check_equivocation(&audit).unwrap();
        lagging.check_equivocation(&audit).unwrap();
    }
}

/// Range query bounds, seen through the request/response surface.
#[test]
fn test_auditing_request_bounds() {
    let mut dir = TestDirectory::new(3);
    dir.update();
    dir.update();

    let auditor = AuditLog::new();
    auditor
        .init_history("dir", dir.key(), &dir.snapshots(0, 2))
        .unwrap();

    let one = auditor.get_observed_strs(&audit_request(&dir, 1, 1));
    assert_eq!(one.as_history().unwrap().len(), 1);

    let reversed = auditor.get_observed_strs(&audit_request(&dir, 2, 1));
    assert_eq!(reversed.status, StatusCode::MalformedMessage);

    let beyond = auditor.get_observed_strs(&audit_request(&dir, 0, 3));
    assert_eq!(beyond.status, StatusCode::MalformedMessage);

    let other = TestDirectory::new(4);
    let unknown = auditor.get_observed_strs(&audit_request(&other, 0, 0));
    assert_eq!(unknown.status, StatusCode::UnknownDirectory);

    // A client handed an error response surfaces the auditor's status.
    let client = new_client(&dir);
    let err = client.check_equivocation(&unknown).unwrap_err();
    assert_eq!(err.status(), StatusCode::UnknownDirectory);
}

/// Identity depends only on the epoch-0 snapshot.
#[test]
fn test_identity_stability() {
    let a = TestDirectory::new(5);
    let mut b = a.clone();
    b.update();
    assert_eq!(a.id(), b.id());
    assert_eq!(a.id(), a.latest_snapshot().directory_id());

    // Different key, same (empty) mapping: different identity.
    let c = TestDirectory::new(6);
    assert_ne!(a.id(), c.id());
}
