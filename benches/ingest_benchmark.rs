// SPDX-License-Identifier: MIT

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use veloride::geo::distance_meters;
use veloride::models::{LocationFix, TrackPoint};
use veloride::services::RecordingSession;

/// Build a synthetic one-hour ride: one fix per second, stepping roughly
/// 28 m north each time, with every tenth fix degraded below the accuracy
/// threshold the way a real receiver drops out under tree cover.
fn synthetic_fixes(count: usize) -> Vec<LocationFix> {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    (0..count)
        .map(|i| LocationFix {
            latitude: 37.0 + i as f64 * 0.00025,
            longitude: -122.0,
            horizontal_accuracy_m: if i % 10 == 9 { 80.0 } else { 8.0 },
            speed_mps: 7.5,
            timestamp: start + Duration::seconds(i as i64),
        })
        .collect()
}

fn benchmark_session_ingest(c: &mut Criterion) {
    let fixes = synthetic_fixes(3600);
    let start = fixes[0].timestamp;

    let mut group = c.benchmark_group("session_ingest");

    group.bench_function("one_hour_ride", |b| {
        b.iter(|| {
            let mut session = RecordingSession::new(start, 70.0);
            for fix in &fixes {
                session.on_fix(black_box(fix));
            }
            black_box(session.total_distance_m())
        })
    });

    group.bench_function("one_hour_ride_with_stop", |b| {
        b.iter(|| {
            let mut session = RecordingSession::new(start, 70.0);
            for fix in &fixes {
                session.on_fix(black_box(fix));
            }
            black_box(session.stop_at(start + Duration::seconds(3600)))
        })
    });

    group.finish();
}

fn benchmark_haversine(c: &mut Criterion) {
    let a = TrackPoint {
        latitude: 37.0,
        longitude: -122.0,
    };
    let b_point = TrackPoint {
        latitude: 37.00089,
        longitude: -122.00042,
    };

    c.bench_function("haversine_distance", |b| {
        b.iter(|| distance_meters(black_box(&a), black_box(&b_point)))
    });
}

criterion_group!(benches, benchmark_session_ingest, benchmark_haversine);
criterion_main!(benches);
