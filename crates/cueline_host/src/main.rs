// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cueline headless host.
//!
//! Replays a scripted editing session against an in-memory backend:
//!
//! ```text
//! cueline_host <script.ron> [settings.ron]
//! ```

mod backend;
mod error;
mod script;
mod settings;

use error::HostError;
use settings::Settings;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(script_path) = args.first() else {
        eprintln!("usage: cueline_host <script.ron> [settings.ron]");
        std::process::exit(2);
    };

    let settings = match args.get(1) {
        Some(path) => Settings::load(Path::new(path)),
        None => Ok(Settings::default()),
    };

    // RUST_LOG wins over the settings file
    let directives = settings
        .as_ref()
        .map_or(settings::DEFAULT_LOG_FILTER, |s| s.log_filter.as_str());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cueline host v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(Path::new(script_path), settings) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(script_path: &Path, settings: Result<Settings, HostError>) -> Result<(), HostError> {
    let settings = settings?;
    let outcomes = script::replay_file(script_path, settings)?;
    tracing::info!(events = outcomes.len(), "replay complete");
    Ok(())
}
