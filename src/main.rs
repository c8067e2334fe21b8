//! link-saver: binary entrypoint.
//! Loads configuration, wires the collaborator clients and serves the
//! webhook plus the read API on Shuttle.

use link_saver::metrics::Metrics;
use link_saver::AppConfig;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("link_saver=info,warn"));

    // Shuttle may already have installed a global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;
    let metrics = Metrics::init()?;
    let state = link_saver::build_state(&cfg)?;
    tracing::info!(app_url = %cfg.app_url, "link-saver starting");

    Ok(link_saver::app(state, &metrics).into())
}
