//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `backbeacon.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - StoreConfig: Which backend, database url, watched path and its layout.
//!     - DashboardConfig: Web server bind address and what the page shows.
//!     - Thresholds: Headrest distance bands (see posture.rs).
//!     - LoggingConfig: Log level and per-update console lines.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::posture::Thresholds;
use crate::store::PathLayout;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Firebase,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub database_url: String,
    pub path: String,
    pub layout: PathLayout,
    /// database secret or id token, appended as ?auth=
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    pub refresh_seconds: u64,
    pub distance_unit: bool,
    pub show_mode: bool,
    pub publish_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_records: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Firebase,
            database_url: "https://your-project-id.firebaseio.com".to_string(),
            path: "BackBeacon".to_string(),
            layout: PathLayout::List,
            auth_token: None,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            refresh_seconds: 2,
            distance_unit: true,
            show_mode: true,
            publish_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_records: true }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("backbeacon.toml"),
            PathBuf::from("..").join("config").join("backbeacon.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: {:#}", e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Dashboard publishing needs the switch on and a path that takes appends
    pub fn publishing_enabled(&self) -> bool {
        self.dashboard.publish_enabled && self.store.layout.accepts_appends()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let backend = match self.store.backend {
            BackendKind::Firebase => self.store.database_url.as_str(),
            BackendKind::Memory => "memory",
        };
        let layout = match self.store.layout {
            PathLayout::List => "list",
            PathLayout::Scalar => "scalar",
        };
        println!("┌─────────────────────────────────────────┐");
        println!("│         BACKBEACON CONFIGURATION        │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Store: {}", backend);
        println!("│ Path: /{} ({})", self.store.path, layout);
        println!("│ Dashboard: http://{}", self.dashboard.bind);
        println!(
            "│ Publishing: {}",
            if self.publishing_enabled() { "enabled" } else { "disabled" }
        );
        println!(
            "│ Thresholds: good < {}cm, slouch > {}cm",
            self.thresholds.normal_cm, self.thresholds.slouch_cm
        );
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
