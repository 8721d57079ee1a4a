//! ==============================================================================
//! main.rs - backbeacon dashboard entry point
//! ==============================================================================
//!
//! purpose:
//!     live posture dashboard for the backbeacon headrest. the headrest module
//!     writes posture observations into a firebase realtime database path;
//!     this binary watches that path and shows the latest one.
//!
//! responsibilities:
//!     - load configuration (backbeacon.toml) and set up logging
//!     - open the configured store backend (firebase rest or in-memory)
//!     - bind the status binder to the path, rendering into the web + console
//!       surfaces on every change
//!     - serve the web dashboard
//!     - `publish`: append one posture record from the command line
//!
//! relationships:
//!     - uses: config.rs (settings), store/ (backends), binder.rs (rendering)
//!     - uses: display.rs (surfaces), web.rs (dashboard), publisher.rs, posture.rs
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                     backbeacon (this file)                   │
//!     │  ┌──────────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//!     │  │ subscription task│  │ web server  │  │ publisher tasks │  │
//!     │  │ (one per path)   │  │ (port 3000) │  │ (fire & forget) │  │
//!     │  └────────┬─────────┘  └──────┬──────┘  └────────┬────────┘  │
//!     │           │ on_record         │ snapshot         │ append    │
//!     │     ┌─────┴──────┐      ┌─────┴──────┐           │           │
//!     │     │  binder    │─────>│  display   │           │           │
//!     │     └────────────┘      └────────────┘           │           │
//!     └───────────┬──────────────────────────────────────┼───────────┘
//!                 │ text/event-stream                    │ POST
//!                 ▼                                      ▼
//!             ┌──────────────────────────────────────────────┐
//!             │   firebase realtime database: /BackBeacon    │
//!             └──────────────────────────────────────────────┘
//!
//! ==============================================================================

mod binder;
mod config;
mod display;
mod domain;
mod posture;
mod publisher;
mod store;
mod web;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::binder::{RenderOptions, StatusBinder};
use crate::config::{AppConfig, BackendKind, StoreConfig};
use crate::display::{ConsoleSurface, SharedDisplay};
use crate::publisher::Publisher;
use crate::store::{Backend, FirebaseStore, MemoryStore};

// ==============================================================================
// command line
// ==============================================================================

#[derive(Parser, Debug)]
#[command(name = "backbeacon", version, about = "Live posture status dashboard")]
struct Cli {
    /// config file (default: config/backbeacon.toml, then ../config/backbeacon.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// database auth token, overrides store.auth_token
    #[arg(long, global = true, env = "BACKBEACON_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// watch the path and serve the dashboard (default)
    Serve,
    /// append one posture record to the path
    Publish {
        /// head-to-headrest distance in cm
        #[arg(value_parser = finite_distance)]
        distance_cm: f64,
        /// explicit status label; derived from the distance when omitted
        #[arg(long)]
        status: Option<String>,
        /// seat is empty: publishes IDLE at 0 cm
        #[arg(long)]
        vacant: bool,
    },
}

/// a distance must survive as a json number
fn finite_distance(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{} is not a finite distance", s))
    }
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };
    if let Some(token) = cli.auth_token {
        config.store.auth_token = Some(token);
    }

    init_tracing(&config.logging.level);

    let backend = open_backend(&config.store)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, backend).await,
        Command::Publish { distance_cm, status, vacant } => {
            publish(&config, backend, distance_cm, status, vacant).await
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn open_backend(store: &StoreConfig) -> Result<Backend> {
    Ok(match store.backend {
        BackendKind::Memory => Backend::Memory(MemoryStore::new(&store.path, store.layout)),
        BackendKind::Firebase => Backend::Firebase(
            FirebaseStore::new(&store.database_url, &store.path, store.layout, store.auth_token.clone())
                .context("failed to set up firebase backend")?,
        ),
    })
}

// ==============================================================================
// serve
// ==============================================================================

async fn serve(config: AppConfig, backend: Backend) -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  BackBeacon Dashboard");
    println!("  \"Sit Up Straight\"");
    println!("===========================================================");
    config.print_summary();

    // step 1: surfaces + binder, subscribed for the life of the process
    let shared = SharedDisplay::new(config.dashboard.show_mode);
    let console = ConsoleSurface::new(config.logging.show_records);
    let binder = StatusBinder::new(
        (shared.clone(), console),
        RenderOptions { distance_unit: config.dashboard.distance_unit },
    );
    let subscription = binder.start(&backend);
    tracing::info!(path = subscription.path(), "watching");

    // step 2: web dashboard in background
    if config.dashboard.publish_enabled && !config.publishing_enabled() {
        tracing::warn!(path = %config.store.path, "scalar path is read-only, dashboard publishing disabled");
    }
    let state = web::WebState::new(&config, shared, backend.clone());
    let bind = config.dashboard.bind.clone();
    let mut web_task = tokio::spawn(async move { web::run_server(state, &bind).await });

    // step 3: run until ctrl-c (or the server dies), then unsubscribe
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            println!("\n[SHUTDOWN] ctrl-c received");
        }
        res = &mut web_task => {
            match res {
                Ok(Ok(())) => tracing::warn!("web server exited"),
                Ok(Err(e)) => tracing::error!("web server error: {:#}", e),
                Err(e) => tracing::error!(error = %e, "web server task failed"),
            }
        }
    }

    if !subscription.is_active() {
        tracing::warn!("subscription had already ended");
    }
    subscription.stop();
    web_task.abort();
    Ok(())
}

// ==============================================================================
// publish
// ==============================================================================

async fn publish(
    config: &AppConfig,
    backend: Backend,
    distance_cm: f64,
    status: Option<String>,
    vacant: bool,
) -> Result<()> {
    anyhow::ensure!(
        config.store.layout.accepts_appends(),
        "path /{} uses the scalar layout and is read-only",
        config.store.path
    );
    if matches!(backend, Backend::Memory(_)) {
        tracing::warn!("memory backend: the record lives only as long as this process");
    }

    if vacant && status.is_some() {
        tracing::warn!("--status ignored for a vacant seat");
    }

    let (status, distance_cm) = match status.filter(|_| !vacant) {
        Some(status) => (status, distance_cm),
        None => match posture::classify(distance_cm, !vacant, &config.thresholds) {
            Some(c) => (c.status.to_string(), c.distance_cm),
            None => {
                println!(
                    "[PUBLISH] {} cm is between {} and {} cm - nothing to publish",
                    distance_cm, config.thresholds.normal_cm, config.thresholds.slouch_cm
                );
                return Ok(());
            }
        },
    };

    println!("[PUBLISH] {} @ {} cm", status, distance_cm);
    Publisher::new(backend)
        .publish(status, distance_cm)
        .await
        .context("publish task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PathLayout;
    use serde_json::json;

    #[test]
    fn test_cli_rejects_non_finite_distance() {
        for bad in ["NaN", "inf", "-inf"] {
            assert!(Cli::try_parse_from(["backbeacon", "publish", "--", bad]).is_err(), "{}", bad);
        }
        assert!(Cli::try_parse_from(["backbeacon", "publish", "forty"]).is_err());

        let cli = Cli::try_parse_from(["backbeacon", "publish", "41.5"]).unwrap();
        match cli.command {
            Some(Command::Publish { distance_cm, .. }) => assert_eq!(distance_cm, 41.5),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_refuses_scalar_path() {
        let mut config = AppConfig::default();
        config.store.layout = PathLayout::Scalar;
        let store = MemoryStore::new("BackBeacon", PathLayout::Scalar);
        let live = json!({"status": "GOOD POSTURE", "distance_cm": 20, "timestamp": "T0"});
        store.set(live.clone());

        let err = publish(&config, Backend::Memory(store.clone()), 45.0, None, false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("read-only"));
        assert_eq!(store.snapshot(), Some(live));
    }

    #[tokio::test]
    async fn test_publish_appends_to_list_path() {
        let config = AppConfig::default();
        let store = MemoryStore::new("BackBeacon", PathLayout::List);

        publish(&config, Backend::Memory(store.clone()), 45.0, None, false).await.unwrap();

        let snapshot = store.snapshot().unwrap();
        let latest = crate::store::latest_record(Some(&snapshot), PathLayout::List).unwrap();
        assert_eq!(latest.status.as_deref(), Some("SLOUCH DETECTED"));
        assert_eq!(latest.distance_cm, Some(45.0));
    }
}
