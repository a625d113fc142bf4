// SPDX-License-Identifier: MIT

//! End-to-end recording tests: fixes in through the bounded channel, a
//! finalized record out of the store.

use std::time::Duration;

use tokio::sync::mpsc;
use veloride::models::LocationAvailability;
use veloride::services::RideOutcome;
use veloride::CoreError;

mod common;
use common::{fix_with_accuracy, good_fix, test_engine, wait_for};

// 0.00089 degrees of latitude is just under 99 m, comfortably inside the
// 100 m jump threshold.
const LEG_DEG: f64 = 0.00089;
const BASE_LAT: f64 = 37.0;
const BASE_LON: f64 = -122.0;

#[tokio::test]
async fn test_full_ride_is_filtered_and_persisted() {
    let engine = test_engine("full-ride");
    let (tx, rx) = mpsc::channel(engine.config.fix_channel_capacity);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("start should succeed");

    tx.send(good_fix(BASE_LAT, BASE_LON, 5.0)).await.unwrap();
    tx.send(good_fix(BASE_LAT + LEG_DEG, BASE_LON, 6.0))
        .await
        .unwrap();
    // Low-accuracy reading: dropped before it can touch the route.
    tx.send(fix_with_accuracy(BASE_LAT + 0.5, BASE_LON, 120.0))
        .await
        .unwrap();
    tx.send(good_fix(BASE_LAT + 2.0 * LEG_DEG, BASE_LON, 4.0))
        .await
        .unwrap();
    // Teleport far outside the plausible-jump threshold.
    tx.send(good_fix(BASE_LAT + 0.2, BASE_LON, 5.0))
        .await
        .unwrap();

    wait_for(
        || {
            let status = handle.status();
            status.route_len == 3 && status.rejected_low_accuracy == 1 && status.rejected_jump == 1
        },
        "all five fixes to be processed",
    )
    .await;

    let record = match handle.stop().await.expect("stop should succeed") {
        RideOutcome::Saved(record) => record,
        RideOutcome::TooFewPoints => panic!("Ride should have been saved"),
    };

    assert_eq!(record.route.len(), 3);
    // Two ~99 m legs; rejected fixes contribute no distance.
    assert!(
        record.distance_m > 190.0 && record.distance_m < 205.0,
        "unexpected distance {}",
        record.distance_m
    );
    // Fastest fix was 6 m/s.
    assert!((record.max_speed_kmh - 21.6).abs() < 1e-9);

    let thumb = record
        .thumbnail_path
        .as_ref()
        .expect("thumbnail should have rendered");
    assert!(std::path::Path::new(thumb).exists());

    let listed = engine.records.list().await.expect("list should succeed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, record.id);

    let fetched = engine
        .records
        .get(record.id)
        .await
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(fetched.route, record.route);
}

#[tokio::test]
async fn test_single_point_ride_is_not_saved() {
    let engine = test_engine("too-few");
    let (tx, rx) = mpsc::channel(8);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("start should succeed");

    tx.send(good_fix(BASE_LAT, BASE_LON, 5.0)).await.unwrap();
    wait_for(|| handle.status().route_len == 1, "the fix to be processed").await;

    match handle.stop().await.expect("stop should succeed") {
        RideOutcome::TooFewPoints => {}
        RideOutcome::Saved(_) => panic!("One-point ride must not be saved"),
    }

    assert!(engine.records.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_start_is_rejected_while_recording() {
    let engine = test_engine("double-start");
    let (_tx, rx) = mpsc::channel(8);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("first start should succeed");

    let (_tx2, rx2) = mpsc::channel(8);
    match engine.recorder.start(LocationAvailability::Available, rx2, None) {
        Err(CoreError::AlreadyRecording) => {}
        Err(other) => panic!("expected AlreadyRecording, got {other}"),
        Ok(_) => panic!("second start must fail"),
    }

    handle.discard().await.expect("discard should succeed");
}

#[tokio::test]
async fn test_recorder_is_free_again_after_stop() {
    let engine = test_engine("restart");
    let (_tx, rx) = mpsc::channel(8);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("start should succeed");
    handle.stop().await.expect("stop should succeed");

    wait_for(|| !engine.recorder.is_recording(), "the slot to free up").await;

    let (_tx2, rx2) = mpsc::channel(8);
    engine
        .recorder
        .start(LocationAvailability::Available, rx2, None)
        .expect("start after stop should succeed");
}

#[tokio::test]
async fn test_start_refused_without_location() {
    let engine = test_engine("availability");

    let (_tx, rx) = mpsc::channel(8);
    match engine.recorder.start(LocationAvailability::PermissionDenied, rx, None) {
        Err(CoreError::PermissionDenied) => {}
        Err(other) => panic!("expected PermissionDenied, got {other}"),
        Ok(_) => panic!("start must fail without permission"),
    }

    let (_tx, rx) = mpsc::channel(8);
    match engine.recorder.start(LocationAvailability::Unavailable, rx, None) {
        Err(CoreError::LocationUnavailable) => {}
        Err(other) => panic!("expected LocationUnavailable, got {other}"),
        Ok(_) => panic!("start must fail without a provider"),
    }

    // Neither refusal claimed the recording slot.
    assert!(!engine.recorder.is_recording());
}

#[tokio::test]
async fn test_fixes_are_ignored_while_paused() {
    let engine = test_engine("pause");
    let (tx, rx) = mpsc::channel(8);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("start should succeed");

    tx.send(good_fix(BASE_LAT, BASE_LON, 5.0)).await.unwrap();
    tx.send(good_fix(BASE_LAT + LEG_DEG, BASE_LON, 5.0))
        .await
        .unwrap();
    wait_for(|| handle.status().route_len == 2, "two accepted fixes").await;

    handle.pause().await.expect("pause should succeed");
    wait_for(
        || handle.status().state == veloride::services::SessionState::Paused,
        "the pause to land",
    )
    .await;

    let frozen_distance = handle.status().distance_m;
    tx.send(good_fix(BASE_LAT + 2.0 * LEG_DEG, BASE_LON, 5.0))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.status().route_len, 2);
    assert_eq!(handle.status().distance_m, frozen_distance);

    handle.resume().await.expect("resume should succeed");
    tx.send(good_fix(BASE_LAT + 2.0 * LEG_DEG, BASE_LON, 5.0))
        .await
        .unwrap();
    wait_for(|| handle.status().route_len == 3, "the post-resume fix").await;

    match handle.stop().await.expect("stop should succeed") {
        RideOutcome::Saved(record) => assert_eq!(record.route.len(), 3),
        RideOutcome::TooFewPoints => panic!("Ride should have been saved"),
    }
}

#[tokio::test]
async fn test_discard_persists_nothing() {
    let engine = test_engine("discard");
    let (tx, rx) = mpsc::channel(8);
    let handle = engine
        .recorder
        .start(LocationAvailability::Available, rx, None)
        .expect("start should succeed");

    tx.send(good_fix(BASE_LAT, BASE_LON, 5.0)).await.unwrap();
    tx.send(good_fix(BASE_LAT + LEG_DEG, BASE_LON, 5.0))
        .await
        .unwrap();
    wait_for(|| handle.status().route_len == 2, "two accepted fixes").await;

    handle.discard().await.expect("discard should succeed");
    wait_for(|| !engine.recorder.is_recording(), "the slot to free up").await;

    assert!(engine.records.list().await.unwrap().is_empty());
}
