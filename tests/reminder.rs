//! Reminder loop tests.

mod common;

use std::time::Duration;

use common::harness;
use minivote::notify::NotifyKind;
use minivote::reminder::ReminderLoop;
use minivote::store::VoteStore;
use tokio::sync::watch;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn reminder_loop(h: &common::Harness, min_age_secs: i64) -> ReminderLoop {
    ReminderLoop::new(
        h.store.clone(),
        h.registry.clone(),
        h.notifier.clone(),
        Duration::from_millis(20),
        min_age_secs,
    )
}

#[tokio::test]
async fn test_scan_reminds_non_voters_once() {
    let h = harness();
    h.manager
        .create_session(
            "v1",
            &strings(&["red"]),
            &strings(&["a@x.com", "b@x.com"]),
        )
        .await
        .unwrap();
    h.manager.cast_vote("v1", "a@x.com", "red").await.unwrap();
    h.mailer.wait_for(2).await; // the two invitations

    let looper = reminder_loop(&h, 0);
    looper.scan_once().await;
    h.mailer.wait_for(3).await;

    let reminders: Vec<_> = h
        .mailer
        .sent()
        .into_iter()
        .filter(|j| j.kind == NotifyKind::Reminder)
        .collect();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].recipient, "b@x.com");
    assert_eq!(reminders[0].vote_id, "v1");

    // The reminded flag is set, so a second pass sends nothing new.
    let ballot = h.store.fetch_ballot("v1", "b@x.com").await.unwrap().unwrap();
    assert!(ballot.reminder_sent);

    looper.scan_once().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reminders = h
        .mailer
        .sent()
        .into_iter()
        .filter(|j| j.kind == NotifyKind::Reminder)
        .count();
    assert_eq!(reminders, 1);
}

#[tokio::test]
async fn test_scan_skips_young_ballots() {
    let h = harness();
    h.manager
        .create_session("v1", &strings(&["red"]), &strings(&["a@x.com"]))
        .await
        .unwrap();
    h.mailer.wait_for(1).await;

    // Staleness threshold of a minute; the row was created just now.
    reminder_loop(&h, 60).scan_once().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h
        .mailer
        .sent()
        .iter()
        .all(|j| j.kind != NotifyKind::Reminder));
}

#[tokio::test]
async fn test_scan_covers_every_registered_session() {
    let h = harness();
    for id in ["v1", "v2"] {
        h.manager
            .create_session(id, &strings(&["red"]), &strings(&["a@x.com"]))
            .await
            .unwrap();
    }
    h.mailer.wait_for(2).await;

    reminder_loop(&h, 0).scan_once().await;
    h.mailer.wait_for(4).await;

    let mut reminded: Vec<_> = h
        .mailer
        .sent()
        .into_iter()
        .filter(|j| j.kind == NotifyKind::Reminder)
        .map(|j| j.vote_id)
        .collect();
    reminded.sort();
    assert_eq!(reminded, strings(&["v1", "v2"]));
}

#[tokio::test]
async fn test_loop_shuts_down_on_signal() {
    let h = harness();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(reminder_loop(&h, 0).run(rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("reminder loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_running_loop_picks_up_due_users() {
    let h = harness();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(reminder_loop(&h, 0).run(rx));

    h.manager
        .create_session("v1", &strings(&["red"]), &strings(&["a@x.com"]))
        .await
        .unwrap();

    // Invitation plus the reminder from a subsequent tick.
    h.mailer.wait_for(2).await;
    assert!(h
        .mailer
        .sent()
        .iter()
        .any(|j| j.kind == NotifyKind::Reminder));

    tx.send(true).unwrap();
    let _ = handle.await;
}
