//! Arena client headless runner
//!
//! Starts the loopback relay and a set of bot-driven client sessions running
//! the real tick loop, then logs a summary per session on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_client::bot::BotPilot;
use arena_client::config::Config;
use arena_client::game::map::{MapConfig, StaticGeometry};
use arena_client::game::ClientSession;
use arena_client::sync::{LoopbackRelay, RelayLink};
use arena_client::util::time::{tick_duration, unix_millis, Timer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    info!(started_at = unix_millis(), "Starting arena client runner");

    let map = match &config.map_file {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::builtin(config.map_id),
    };
    info!(
        map = %map.name,
        platforms = map.platforms.len(),
        targets = map.targets.len(),
        "Map loaded"
    );
    let geometry = Arc::new(StaticGeometry::from_map(&map));

    let relay = LoopbackRelay::new(config.hit_damage);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tick = tick_duration(config.tick_rate);

    let mut sessions = Vec::with_capacity(config.bot_count);
    for index in 0..config.bot_count {
        let (relay_id, link) = relay.connect();
        let RelayLink { transport, inbound } = link;
        let session = ClientSession::new(geometry.clone(), Box::new(transport));
        let pilot = BotPilot::new(config.seed.wrapping_add(index as u64));
        info!(bot = index, player_id = %relay_id, "Bot session starting");
        sessions.push(tokio::spawn(session.run(inbound, pilot, tick, shutdown_rx.clone())));
    }

    let timer = Timer::new();
    let run_for = async {
        if config.run_secs == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(config.run_secs)).await;
        }
    };

    tokio::select! {
        _ = run_for => info!("Run time elapsed, stopping sessions"),
        _ = shutdown_signal() => {}
    }
    let _ = shutdown_tx.send(true);

    for handle in sessions {
        match handle.await {
            Ok(summary) => info!(
                player_id = ?summary.player_id,
                ticks = summary.ticks,
                health = summary.health,
                remotes = summary.remote_players,
                shots = summary.stats.shots_fired,
                player_hits = summary.stats.player_hits,
                target_hits = summary.stats.target_hits,
                reloads = summary.stats.reloads,
                sent = summary.sync.sent,
                received = summary.sync.received,
                dropped = summary.sync.dropped_malformed + summary.sync.dropped_stale,
                "Session summary"
            ),
            Err(e) => error!(error = %e, "Session task failed"),
        }
    }

    info!(elapsed_ms = timer.elapsed_ms(), peers = relay.peer_count(), "Runner shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
