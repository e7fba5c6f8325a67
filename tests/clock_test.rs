//! Clock behaviour under a hosted session, with tokio's paused clock so
//! ticks are deterministic.

mod common;

use std::time::Duration;

use chess_core::Side;
use common::{config, drain, play, spawn_host, FOOLS_MATE};
use game_session::SessionEvent;
use tokio::time;

#[tokio::test(start_paused = true)]
async fn test_no_decrement_before_first_full_period() {
    let (handle, host) = spawn_host(config(600), None);
    let mut black = handle.subscribe_clock(Side::Black).await.unwrap();
    let mut white = handle.subscribe_clock(Side::White).await.unwrap();

    play(&handle, &[("e2", "e4")]).await;
    time::sleep(Duration::from_millis(999)).await;
    assert_eq!(drain(&mut black), vec![600]);

    time::sleep(Duration::from_millis(2)).await;
    assert_eq!(drain(&mut black), vec![599]);
    assert_eq!(drain(&mut white), vec![600]);

    handle.shutdown();
    host.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_only_side_to_move_runs() {
    let (handle, host) = spawn_host(config(600), None);
    let mut black = handle.subscribe_clock(Side::Black).await.unwrap();
    let mut white = handle.subscribe_clock(Side::White).await.unwrap();

    play(&handle, &[("e2", "e4")]).await;
    time::sleep(Duration::from_millis(3500)).await;
    play(&handle, &[("e7", "e5")]).await;
    time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(drain(&mut black), vec![600, 599, 598, 597]);
    assert_eq!(drain(&mut white), vec![600, 599, 598]);

    handle.shutdown();
    host.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timeout_declares_winner_and_freezes() {
    let (handle, host) = spawn_host(config(2), None);
    let mut events = handle.subscribe_events().await.unwrap();
    let mut black = handle.subscribe_clock(Side::Black).await.unwrap();

    play(&handle, &[("e2", "e4")]).await;

    // 2 -> 1 -> 0, then the next tick finds zero
    let event = time::timeout(Duration::from_secs(10), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, SessionEvent::Timeout { winner: Side::White });
    assert_eq!(drain(&mut black), vec![2, 1, 0]);

    time::sleep(Duration::from_secs(30)).await;
    assert!(drain(&mut black).is_empty());
    assert!(!handle
        .submit_move(common::sq("e7"), common::sq("e5"), None)
        .await
        .unwrap());

    handle.shutdown();
    host.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_running_schedule() {
    let (handle, host) = spawn_host(config(600), None);
    let mut black = handle.subscribe_clock(Side::Black).await.unwrap();
    let mut white = handle.subscribe_clock(Side::White).await.unwrap();

    play(&handle, &[("e2", "e4")]).await;
    time::sleep(Duration::from_millis(1500)).await;
    handle.reset().await.unwrap();
    time::sleep(Duration::from_secs(10)).await;

    assert_eq!(drain(&mut black), vec![600, 599, 600]);
    assert_eq!(drain(&mut white), vec![600, 600]);

    // A new first move restarts the schedule from scratch
    play(&handle, &[("d2", "d4")]).await;
    time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(drain(&mut black), vec![599]);

    handle.shutdown();
    host.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_checkmate_stops_decrements() {
    let (handle, host) = spawn_host(config(600), None);
    let mut white = handle.subscribe_clock(Side::White).await.unwrap();
    let mut black = handle.subscribe_clock(Side::Black).await.unwrap();

    play(&handle, &FOOLS_MATE).await;
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(drain(&mut white), vec![600]);
    assert_eq!(drain(&mut black), vec![600]);

    handle.shutdown();
    host.await.unwrap();
}
