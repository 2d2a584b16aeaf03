//! Replay a scripted sketch session and print the features as GeoJSON

use std::path::PathBuf;
use std::process::ExitCode;

use sketch_core::feature_collection;
use sketch_frontend::{ConfigManager, replay};

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketch_frontend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: sketch-replay <script.ron>");
        return ExitCode::from(2);
    };

    let mut manager = ConfigManager::new();
    if manager.is_dirty()
        && let Err(e) = manager.save()
    {
        tracing::warn!("Failed to save default config: {}", e);
    }
    let base = manager.config().sketch.clone();

    let features = match replay::run_file(&path, &base) {
        Ok(features) => features,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&feature_collection(&features)) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to encode features: {}", e);
            ExitCode::FAILURE
        }
    }
}
