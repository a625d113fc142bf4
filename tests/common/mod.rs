// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use veloride::config::Config;
use veloride::db::LocalStore;
use veloride::models::LocationFix;
use veloride::Engine;

/// Create a unique scratch directory for thumbnail artifacts.
#[allow(dead_code)]
pub fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("veloride-test-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

/// Build an engine on an in-memory store, writing artifacts to a scratch dir.
#[allow(dead_code)]
pub fn test_engine(label: &str) -> Engine {
    let config = Config {
        data_dir: scratch_dir(label),
        ..Config::default()
    };
    let store = LocalStore::open_in_memory().expect("Failed to open in-memory store");
    Engine::with_store(config, store).expect("Failed to build engine")
}

/// A location fix with good accuracy at the given coordinate.
#[allow(dead_code)]
pub fn good_fix(latitude: f64, longitude: f64, speed_mps: f64) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        horizontal_accuracy_m: 10.0,
        speed_mps,
        timestamp: Utc::now(),
    }
}

/// A fix with the given accuracy radius.
#[allow(dead_code)]
pub fn fix_with_accuracy(latitude: f64, longitude: f64, accuracy_m: f64) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        horizontal_accuracy_m: accuracy_m,
        speed_mps: 5.0,
        timestamp: Utc::now(),
    }
}

/// Poll `pred` until it holds, panicking after two seconds.
#[allow(dead_code)]
pub async fn wait_for<F>(mut pred: F, what: &str)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {what}");
}
