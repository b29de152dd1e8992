//! End-to-end tests for tasks and agents.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use wisp::task::{self, JoinError};
use wisp::Agent;

#[tokio::test(flavor = "multi_thread")]
async fn tasks_join_in_spawn_order() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let tasks: Vec<_> = (1u64..=5)
            .map(|i| {
                task::spawn(move || async move {
                    // Later tasks finish earlier; join order must not care.
                    sleep(Duration::from_millis(60 - i * 10)).await;
                    i * i
                })
            })
            .collect();

        let results: Vec<u64> = task::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        let _ = done_tx.send(results);
    });

    let results = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(results, vec![1, 4, 9, 16, 25]);
}

#[tokio::test(flavor = "multi_thread")]
async fn crashed_task_surfaces_its_exit_reason() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let task = task::spawn::<u64, _, _>(|| async { panic!("task blew up") });
        let _ = done_tx.send(task.join().await);
    });

    let result = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    match result {
        Err(JoinError::Exited { reason, .. }) => {
            assert_eq!(reason, wisp::ExitReason::error("task blew up"));
        }
        other => panic!("expected Exited, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn poll_join_times_out_then_succeeds() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let mut task = task::spawn(|| async {
            sleep(Duration::from_millis(150)).await;
            42u64
        });

        let early = task.poll_join(Duration::from_millis(20)).await;
        sleep(Duration::from_millis(200)).await;
        let late = task.poll_join(Duration::from_millis(20)).await;
        let _ = done_tx.send((early.is_none(), late));
    });

    let (timed_out_first, late) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert!(timed_out_first);
    assert_eq!(late.unwrap().unwrap(), 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn poll_join_then_join_reuses_the_outcome() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let mut task = task::spawn(|| async { "ready".to_string() });

        // Wait long enough that the first poll already consumes the Down.
        sleep(Duration::from_millis(50)).await;
        let polled = task.poll_join(Duration::from_millis(100)).await;
        let joined = task.join().await;
        let _ = done_tx.send((polled, joined));
    });

    let (polled, joined) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(polled.unwrap().unwrap(), "ready");
    assert_eq!(joined.unwrap(), "ready");
}

#[tokio::test(flavor = "multi_thread")]
async fn agent_applies_updates_in_order() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let counter = Agent::start_link(|| 0u64);
        counter.update(|n| *n += 1).await.unwrap();
        counter.update(|n| *n += 1).await.unwrap();
        let value = counter.get(|n| *n).await.unwrap();
        let doubled = counter
            .get_and_update(|n| {
                let old = *n;
                *n *= 2;
                old
            })
            .await
            .unwrap();
        let after = counter.get(|n| *n).await.unwrap();
        let _ = done_tx.send((value, doubled, after));
    });

    let (value, doubled, after) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value, 2);
    assert_eq!(doubled, 2);
    assert_eq!(after, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn agent_serializes_concurrent_updates() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let counter = Agent::start_link(|| 0u64);

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let counter = counter.clone();
                task::spawn(move || async move {
                    for _ in 0..100 {
                        counter.update(|n| *n += 1).await.unwrap();
                    }
                    0u8
                })
            })
            .collect();
        for result in task::join_all(tasks).await {
            result.unwrap();
        }

        let total = counter.get(|n| *n).await.unwrap();
        let _ = done_tx.send(total);
    });

    let total = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total, 1000);
}

#[tokio::test(flavor = "multi_thread")]
async fn agent_keeps_serving_after_owner_exits_normally() {
    wisp::init();
    let (agent_tx, agent_rx) = oneshot::channel();

    // The owner starts the agent, hands out the handle, and returns. Its
    // normal exit puts an Exit message in the agent's mailbox; the agent
    // drains it and keeps serving.
    wisp::spawn(move || async move {
        let counter = Agent::start_link(|| 0u64);
        counter.update(|n| *n += 1).await.unwrap();
        let _ = agent_tx.send(counter);
    });

    let counter = timeout(Duration::from_secs(5), agent_rx)
        .await
        .unwrap()
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    assert!(wisp::alive(counter.pid()));
    counter.update(|n| *n += 1).await.unwrap();
    assert_eq!(counter.get(|n| *n).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_agent_rejects_requests() {
    wisp::init();
    let (done_tx, done_rx) = oneshot::channel();

    wisp::spawn(move || async move {
        let agent = Agent::start_link(|| String::from("state"));
        let pid = agent.pid();

        agent.stop().unwrap();
        sleep(Duration::from_millis(100)).await;

        let rejected = agent.get(|s| s.clone()).await.is_err();
        let _ = done_tx.send((pid, rejected));
    });

    let (pid, rejected) = timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
    assert!(rejected);
    assert!(!wisp::alive(pid));
}
