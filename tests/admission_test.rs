//! Concurrency tests for the admission gate and instrumentation hook.
//!
//! None of these need a live server: the gate and hook are exactly the code
//! that runs before and after network dispatch, so they are driven directly
//! with simulated in-flight operations.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use redis_gate::store::{AdmissionGate, CommandHook, OpKind};

fn hook_with_ceiling(ceiling: u32) -> (Arc<AdmissionGate>, CommandHook) {
    let gate = Arc::new(AdmissionGate::new(ceiling));
    let hook = CommandHook::new(Arc::clone(&gate), Duration::from_millis(100));
    (gate, hook)
}

#[tokio::test]
async fn test_admission_monotonicity() {
    // Ceiling of 3: exactly 3 concurrent operations are admitted and the 4th
    // attempt is the first rejection.
    let (gate, hook) = hook_with_ceiling(3);

    let mut tokens = Vec::new();
    for _ in 0..3 {
        gate.allow().expect("under the ceiling");
        tokens.push(hook.begin(OpKind::Command));
    }

    let rejected = gate.allow().unwrap_err();
    assert!(rejected.is_too_many_processing());

    // Draining one slot re-admits.
    let token = tokens.pop().unwrap();
    hook.finish(token, "get", None);
    assert!(gate.allow().is_ok());

    for token in tokens {
        hook.finish(token, "get", None);
    }
    assert_eq!(gate.processing(), 0);
}

#[tokio::test]
async fn test_counter_symmetry_under_random_interleavings() {
    // Random interleavings of concurrent operations, successes and failures
    // mixed; the processing counters must return to zero once all complete.
    let mut seed_rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..5 {
        let n = seed_rng.gen_range(1..=1000);
        let (gate, hook) = hook_with_ceiling(n);

        let mut tasks = Vec::with_capacity(n as usize);
        for i in 0..n {
            let hook = hook.clone();
            let mut rng = StdRng::seed_from_u64(u64::from(i));
            tasks.push(tokio::spawn(async move {
                let kind = if rng.gen_bool(0.3) {
                    OpKind::Pipeline
                } else {
                    OpKind::Command
                };
                let token = hook.begin(kind);
                tokio::time::sleep(Duration::from_micros(rng.gen_range(0..500))).await;
                let error = if rng.gen_bool(0.2) {
                    Some("simulated failure")
                } else {
                    None
                };
                hook.finish(token, "get", error);
            }));
        }
        futures::future::join_all(tasks).await;

        assert_eq!(gate.processing(), 0, "single counter drained");
        assert_eq!(gate.pipe_processing(), 0, "pipeline counter drained");
        assert_eq!(gate.total(), u64::from(n), "lifetime total is monotone");
    }
}

#[tokio::test]
async fn test_third_caller_rejected_while_two_in_flight() {
    // Ceiling of 2, two long-running commands in flight: a concurrent third
    // command is rejected immediately, without dispatch, while the first two
    // complete and drain the counter back to zero.
    let (gate, hook) = hook_with_ceiling(2);

    let (release, released) = tokio::sync::watch::channel(false);
    let mut in_flight = Vec::new();
    for _ in 0..2 {
        gate.allow().expect("under the ceiling");
        let token = hook.begin(OpKind::Command);
        let hook = hook.clone();
        let mut released = released.clone();
        in_flight.push(tokio::spawn(async move {
            let _ = released.changed().await;
            hook.finish(token, "get", None);
        }));
    }
    assert_eq!(gate.processing(), 2);

    // The third caller gets the rejection synchronously.
    let rejected = gate.allow().unwrap_err();
    assert!(rejected.is_too_many_processing());

    release.send(true).unwrap();
    futures::future::join_all(in_flight).await;

    assert_eq!(gate.processing(), 0);
    assert!(gate.allow().is_ok());
}

#[tokio::test]
async fn test_cancelled_dispatch_still_drains_counter() {
    // An outer deadline can drop the dispatch future between begin and
    // finish; the token must settle the counter anyway.
    let (gate, hook) = hook_with_ceiling(10);

    let slow_dispatch = {
        let hook = hook.clone();
        async move {
            let _token = hook.begin(OpKind::Command);
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    };
    let timed_out = tokio::time::timeout(Duration::from_millis(10), slow_dispatch).await;
    assert!(timed_out.is_err());

    assert_eq!(gate.processing(), 0);
    assert_eq!(gate.total(), 1);
}
