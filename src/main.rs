// SPDX-License-Identifier: MIT

//! Replay driver: feeds a recorded fix log through the full engine.
//!
//! Usage: `veloride <fixes.json>` where the file holds a JSON array of
//! location fixes. The ride is recorded, finalized, persisted, and (if
//! `VELORIDE_ACCESS_TOKEN` is set) pushed to the remote service.

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veloride::models::{LocationAvailability, LocationFix};
use veloride::services::RideOutcome;
use veloride::time_utils::format_duration_hms;
use veloride::{config::Config, Engine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let fixes_path = std::env::args()
        .nth(1)
        .ok_or("usage: veloride <fixes.json>")?;
    let raw = std::fs::read_to_string(&fixes_path)?;
    let fixes: Vec<LocationFix> = serde_json::from_str(&raw)?;
    tracing::info!(path = %fixes_path, count = fixes.len(), "Loaded fix log");

    let config = Config::from_env()?;
    let engine = Engine::new(config.clone())?;

    let (fix_tx, fix_rx) = mpsc::channel(config.fix_channel_capacity);
    let handle =
        engine
            .recorder
            .start(LocationAvailability::Available, fix_rx, access_token())?;

    let ticker = tokio::spawn(veloride::services::run_elapsed_ticker(
        handle.status_stream(),
        |elapsed| println!("elapsed {elapsed}"),
    ));

    // Replay the log on the provider's cadence, compressed for the demo.
    let feeder = tokio::spawn(async move {
        for fix in fixes {
            if fix_tx.send(fix).await.is_err() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    });

    feeder.await?;
    // The feeder closed the channel; take a beat to drain, then stop.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    match handle.stop().await? {
        RideOutcome::Saved(record) => {
            println!(
                "saved ride #{}: {:.2} km in {}, avg {:.1} km/h, max {:.1} km/h, {} kcal",
                record.id,
                record.distance_m / 1000.0,
                format_duration_hms(record.duration_ms),
                record.avg_speed_kmh,
                record.max_speed_kmh,
                record.calories,
            );
            if let Some(thumb) = &record.thumbnail_path {
                println!("thumbnail: {thumb}");
            }
        }
        RideOutcome::TooFewPoints => {
            println!("too few points, ride not saved");
        }
    }

    ticker.await?;
    let records = engine.records.list().await?;
    println!("{} ride(s) on record", records.len());
    Ok(())
}

fn access_token() -> Option<String> {
    std::env::var("VELORIDE_ACCESS_TOKEN").ok()
}

/// Initialize structured logging for the CLI.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("veloride=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
