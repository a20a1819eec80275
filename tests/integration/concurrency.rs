//! Integration test: concurrent ingestion and queries.
//!
//! Several threads extend distinct directories while readers query ranges
//! of the same directories. Readers must only ever see admitted, gap-free
//! history.

use std::sync::atomic::{AtomicBool, Ordering};

use vouch_auditlog::AuditLog;
use vouch_integration_tests::{TestDirectory, new_client};
use vouch_proto::AuditingRequest;

const EPOCHS: u64 = 40;

fn grown(seed: u8) -> TestDirectory {
    let mut dir = TestDirectory::new(seed);
    for _ in 0..EPOCHS {
        dir.update();
    }
    dir
}

#[test]
fn test_parallel_ingest_distinct_directories() {
    let dirs: Vec<_> = (1..=6u8).map(grown).collect();
    let auditor = AuditLog::new();
    for dir in &dirs {
        auditor.init_history("d", dir.key(), &dir.snapshots(0, 0)).unwrap();
    }

    std::thread::scope(|s| {
        for dir in &dirs {
            let auditor = &auditor;
            s.spawn(move || {
                // Mix single-snapshot and batched extends.
                let mut next = 1;
                while next <= EPOCHS {
                    let end = (next + next % 3).min(EPOCHS);
                    auditor.extend(&dir.id(), &dir.snapshots(next, end)).unwrap();
                    next = end + 1;
                }
            });
        }
    });

    for dir in &dirs {
        assert_eq!(
            auditor.observed_range(&dir.id(), 0, EPOCHS).unwrap(),
            dir.snapshots(0, EPOCHS)
        );
    }
}

#[test]
fn test_readers_never_see_partial_ranges() {
    let dir = grown(9);
    let auditor = AuditLog::new();
    auditor.init_history("d", dir.key(), &dir.snapshots(0, 0)).unwrap();
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            for start in (1..=EPOCHS).step_by(4) {
                let end = (start + 3).min(EPOCHS);
                auditor.extend(&dir.id(), &dir.snapshots(start, end)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        for _ in 0..3 {
            s.spawn(|| {
                let client = new_client(&dir);
                while !done.load(Ordering::SeqCst) {
                    let latest = auditor.latest(&dir.id()).unwrap().epoch;
                    // Writes land in batches of four on top of epoch 0.
                    assert_eq!(latest % 4, 0);

                    let audit = auditor.get_observed_strs(&AuditingRequest {
                        directory_id: dir.id(),
                        start_epoch: 0,
                        end_epoch: latest,
                    });
                    let range = audit.as_history().unwrap();
                    assert_eq!(range.len() as u64, latest + 1);
                    client.check_equivocation(&audit).unwrap();
                }
            });
        }
    });

    assert_eq!(auditor.latest(&dir.id()).unwrap().epoch, EPOCHS);
}

#[test]
fn test_racing_inits_admit_one() {
    let dir = TestDirectory::new(12);
    let auditor = AuditLog::new();

    let successes: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| auditor.init_history("d", dir.key(), &dir.snapshots(0, 0)).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum()
    });

    assert_eq!(successes, 1);
    assert_eq!(auditor.directories().len(), 1);
}
