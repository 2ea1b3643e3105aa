//! Rate Ledger integration tests (spec §4.2).

use crate::common;

use agency_os::engines::rate_ledger::{RateLedger, ReserveOutcome};
use agency_os::types::ids::ResourceId;
use chrono::Utc;

#[tokio::test]
async fn reserve_succeeds_until_cap_then_exhausts() {
    let db = common::test_pool().await;
    let ledger = RateLedger::new(db);
    let resource = ResourceId::new();
    let now = Utc::now();

    for expected_remaining in (0..3).rev() {
        let outcome = ledger.try_reserve(resource, 3, now).await.expect("reserve should succeed");
        assert_eq!(outcome, ReserveOutcome::Ok { remaining: expected_remaining });
    }

    let outcome = ledger.try_reserve(resource, 3, now).await.expect("reserve query should succeed");
    assert_eq!(outcome, ReserveOutcome::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn release_frees_a_unit_back_to_the_same_hour_bucket() {
    let db = common::test_pool().await;
    let ledger = RateLedger::new(db);
    let resource = ResourceId::new();
    let now = Utc::now();

    ledger.try_reserve(resource, 1, now).await.expect("first reserve should succeed");
    assert_eq!(
        ledger.try_reserve(resource, 1, now).await.expect("second reserve query should succeed"),
        ReserveOutcome::Exhausted
    );

    ledger.release(resource, now).await;
    // The actor processes release asynchronously; advancing the paused clock
    // lets the writer task drain the channel without a real wall-clock wait.
    tokio::time::advance(std::time::Duration::from_millis(50)).await;

    let usage = ledger.current_usage(resource, now).await.expect("usage query should succeed");
    assert_eq!(usage, 0);
}

#[tokio::test]
async fn separate_resources_have_independent_caps() {
    let db = common::test_pool().await;
    let ledger = RateLedger::new(db);
    let a = ResourceId::new();
    let b = ResourceId::new();
    let now = Utc::now();

    assert_eq!(
        ledger.try_reserve(a, 1, now).await.expect("reserve a"),
        ReserveOutcome::Ok { remaining: 0 }
    );
    assert_eq!(
        ledger.try_reserve(b, 1, now).await.expect("reserve b"),
        ReserveOutcome::Ok { remaining: 0 }
    );
}
