//! Concurrency tests: racing casts and registry mutation.

mod common;

use std::sync::Arc;

use common::harness;
use minivote::manager::CastOutcome;
use minivote::registry::SessionRegistry;
use minivote::store::VoteStore;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_casts_single_winner() {
    let h = harness();
    let options: Vec<String> = (0..16).map(|i| format!("opt{i}")).collect();
    h.manager
        .create_session("race", &options, &strings(&["a@x.com"]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for option in &options {
        let manager = h.manager.clone();
        let option = option.clone();
        handles.push(tokio::spawn(async move {
            manager.cast_vote("race", "a@x.com", &option).await.unwrap()
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        if handle.await.unwrap() == CastOutcome::Recorded {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);

    let ballot = h
        .store
        .fetch_ballot("race", "a@x.com")
        .await
        .unwrap()
        .unwrap();
    let stored = ballot.choice.expect("exactly one cast must have landed");
    assert!(options.contains(&stored));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_casts_distinct_users_all_recorded() {
    let h = harness();
    let users: Vec<String> = (0..32).map(|i| format!("u{i}@x.com")).collect();
    h.manager
        .create_session("v1", &strings(&["red", "blue"]), &users)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for user in &users {
        let manager = h.manager.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            manager.cast_vote("v1", &user, "red").await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), CastOutcome::Recorded);
    }

    let tally = h.manager.tally("v1").await.unwrap();
    assert_eq!(tally.get("red"), Some(&32));
}

#[test]
fn test_registry_concurrent_mutation() {
    let registry = Arc::new(SessionRegistry::new());
    let mut handles = Vec::new();

    for t in 0..8 {
        let registry = registry.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..100 {
                registry.add(&format!("s{t}-{i}"));
                // Snapshots must stay usable while writers run.
                let _ = registry.snapshot().len();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 800);

    registry.remove_one("s0-0");
    assert_eq!(registry.len(), 799);
    registry.remove_all();
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_all_races_with_creates() {
    let h = harness();
    for i in 0..8 {
        h.manager
            .create_session(&format!("v{i}"), &strings(&["red"]), &strings(&["a@x.com"]))
            .await
            .unwrap();
    }

    let removed = h.manager.delete_all().await.unwrap();
    assert_eq!(removed, 8);

    // A fresh session after the purge works normally.
    h.manager
        .create_session("fresh", &strings(&["red"]), &strings(&["a@x.com"]))
        .await
        .unwrap();
    assert_eq!(
        h.manager.cast_vote("fresh", "a@x.com", "red").await.unwrap(),
        CastOutcome::Recorded
    );
}
