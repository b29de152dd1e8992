//! End-to-end tests for spawning, messaging, and selective receive.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::timeout;
use wisp::{Pid, Selector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Msg {
    First(u32),
    Second(String),
    Third,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum CounterMsg {
    Inc(u64),
    Get(Pid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Count(u64);

#[tokio::test(flavor = "multi_thread")]
async fn counter_process_sums_messages() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    let pid = wisp::spawn(move || async move {
        let mut total = 0u64;
        for _ in 0..3 {
            let msg = wisp::recv().await.unwrap();
            total += msg.decode::<u64>().unwrap();
        }
        let _ = done_tx.send(total);
    });

    let handle = wisp::handle();
    handle.send(pid, &1u64);
    handle.send(pid, &2u64);
    handle.send(pid, &3u64);

    let total = timeout(Duration::from_secs(5), done_rx).await.unwrap();
    assert_eq!(total, Ok(6));
}

#[tokio::test(flavor = "multi_thread")]
async fn counter_server_replies_from_inside_its_receive_arm() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    // A request/reply server: the reply to Get leaves from inside the
    // receive arm, while the receive still holds the mailbox.
    let server = wisp::spawn(|| async {
        let mut total = 0u64;
        loop {
            let snapshot = total;
            let added = wisp::receive(Selector::new().raw(move |raw| {
                match raw.decode::<CounterMsg>()? {
                    CounterMsg::Inc(n) => Some(n),
                    CounterMsg::Get(reply_to) => {
                        wisp::send(reply_to, &Count(snapshot));
                        Some(0)
                    }
                }
            }))
            .await
            .unwrap();
            total += added;
        }
    });

    wisp::spawn(move || async move {
        for n in [1u64, 2, 3] {
            wisp::send(server, &CounterMsg::Inc(n));
        }
        wisp::send(server, &CounterMsg::Get(wisp::current_pid()));

        let reply = wisp::recv_timeout(Duration::from_millis(500))
            .await
            .ok()
            .flatten()
            .and_then(|raw| raw.decode::<Count>());
        let _ = done_tx.send(reply);
    });

    let reply = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, Some(Count(6)));
}

#[tokio::test(flavor = "multi_thread")]
async fn messages_between_two_processes_stay_in_order() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    let receiver = wisp::spawn(move || async move {
        let mut seen = Vec::new();
        for _ in 0..100 {
            let msg = wisp::recv().await.unwrap();
            seen.push(msg.decode::<u32>().unwrap());
        }
        let _ = done_tx.send(seen);
    });

    wisp::spawn(move || async move {
        for i in 0..100u32 {
            wisp::send(receiver, &i);
        }
    });

    let seen = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, (0..100).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread")]
async fn selective_receive_skips_earlier_messages() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    let pid = wisp::spawn(move || async move {
        // Pull out Second even though First arrived before it.
        let picked = wisp::receive(Selector::new().raw(|raw| match raw.decode::<Msg>() {
            Some(Msg::Second(text)) => Some(text),
            _ => None,
        }))
        .await
        .unwrap();

        // The skipped messages are still there, still in arrival order.
        let first = wisp::recv().await.unwrap().decode::<Msg>().unwrap();
        let third = wisp::recv().await.unwrap().decode::<Msg>().unwrap();

        let _ = done_tx.send((picked, first, third));
    });

    let handle = wisp::handle();
    handle.send(pid, &Msg::First(1));
    handle.send(pid, &Msg::Second("hello".to_string()));
    handle.send(pid, &Msg::Third);

    let (picked, first, third) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked, "hello");
    assert_eq!(first, Msg::First(1));
    assert_eq!(third, Msg::Third);
}

#[tokio::test(flavor = "multi_thread")]
async fn receive_times_out_when_nothing_matches() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    let pid = wisp::spawn(move || async move {
        let started = Instant::now();
        let outcome = wisp::receive(
            Selector::new()
                .matching_when(|m: &Msg| matches!(m, Msg::Third), |_| "matched")
                .after(Duration::from_millis(100), || "timed out"),
        )
        .await
        .unwrap();
        let _ = done_tx.send((outcome, started.elapsed()));
    });

    // Only a non-matching message arrives.
    wisp::handle().send(pid, &Msg::First(7));

    let (outcome, elapsed) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, "timed out");
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn send_to_dead_process_is_a_noop() {
    wisp::init();

    let pid = wisp::spawn(|| async {});
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!wisp::alive(pid));

    // Must not panic or error.
    wisp::handle().send(pid, &Msg::Third);
}

#[tokio::test(flavor = "multi_thread")]
async fn sent_messages_are_copies() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    let pid = wisp::spawn(move || async move {
        let msg = wisp::recv().await.unwrap();
        let _ = done_tx.send(msg.decode::<Vec<u8>>().unwrap());
    });

    let mut payload = vec![1u8, 2, 3];
    wisp::handle().send(pid, &payload);
    // Mutating the original after the send must not affect the receiver.
    payload[0] = 99;

    let received = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, vec![1, 2, 3]);
}
