//! Business Rule Tests: Fingerprint Deduplication
//!
//! A repeated alert fingerprint must not re-admit processing within its
//! cooldown window; this is the guard against alert-storm pile-up.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::fixtures::*;
use remediator::traits::AttemptStore;

#[tokio::test]
async fn test_dedup_blocks_repeated_fingerprint_within_cooldown() {
    let db = TestDatabase::new().await.unwrap();
    let store = db.store();
    let now = Utc::now();
    let cooldown = ChronoDuration::seconds(300);

    let (first, prior) = store.admit_fingerprint("fp-1", cooldown, now).await.unwrap();
    assert!(first, "first admission should succeed");
    assert!(prior.is_none(), "no prior timestamp on first admission");

    let (second, prior) = store.admit_fingerprint("fp-1", cooldown, now + ChronoDuration::seconds(10)).await.unwrap();
    assert!(!second, "repeated fingerprint within cooldown should be rejected");
    assert!(prior.is_some(), "rejection should surface the prior admission time");
}

#[tokio::test]
async fn test_dedup_admits_again_after_cooldown_elapses() {
    let db = TestDatabase::new().await.unwrap();
    let store = db.store();
    let now = Utc::now();
    let cooldown = ChronoDuration::seconds(60);

    store.admit_fingerprint("fp-2", cooldown, now).await.unwrap();

    let (admitted, _) = store.admit_fingerprint("fp-2", cooldown, now + ChronoDuration::seconds(120)).await.unwrap();
    assert!(admitted, "fingerprint should be admitted again once cooldown elapses");
}

#[tokio::test]
async fn test_dedup_is_scoped_per_fingerprint() {
    let db = TestDatabase::new().await.unwrap();
    let store = db.store();
    let now = Utc::now();
    let cooldown = ChronoDuration::seconds(300);

    store.admit_fingerprint("fp-a", cooldown, now).await.unwrap();
    let (admitted, _) = store.admit_fingerprint("fp-b", cooldown, now).await.unwrap();
    assert!(admitted, "a distinct fingerprint must not be blocked by another's cooldown");
}

#[tokio::test]
async fn test_concurrent_admission_of_same_fingerprint_is_exclusive() {
    let db = TestDatabase::new().await.unwrap();
    let store: std::sync::Arc<dyn AttemptStore> = db.store_arc();
    let now = Utc::now();
    let cooldown = ChronoDuration::seconds(300);

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.admit_fingerprint("fp-race", cooldown, now).await.unwrap().0 })
        })
        .collect();

    let mut admitted_count = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted_count += 1;
        }
    }

    assert_eq!(admitted_count, 1, "exactly one concurrent admission should win");
}
