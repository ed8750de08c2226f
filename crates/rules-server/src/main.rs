//! Home rules runner
//!
//! Loads the rules configuration, wires the monitors to an in-process host
//! and runs them until Ctrl-C. Signal values are read from stdin as
//! `entity_id=value` lines; control and notify services only log what they
//! would do.

mod feed;

use anyhow::{Context, Result};
use rules_config::{load_file, RulesConfig};
use rules_core::{Clock, ServiceRef, SystemClock};
use rules_engine::{build_monitors, Runtime};
use rules_host::{ServiceRegistry, SignalBus, SignalStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "HOME_RULES_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "home_rules.yaml";

/// The in-process host the rules run against
pub struct HomeRules {
    pub bus: Arc<SignalBus>,
    pub signals: Arc<SignalStore>,
    pub services: Arc<ServiceRegistry>,
    pub clock: Arc<dyn Clock>,
}

impl HomeRules {
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(SignalBus::new());
        let signals = Arc::new(SignalStore::new(bus.clone(), clock.clone()));
        let services = Arc::new(ServiceRegistry::new());

        Self {
            bus,
            signals,
            services,
            clock,
        }
    }

    /// Register a handler that logs each call to `service`
    fn register_logging_service(&self, service: ServiceRef) {
        let name = service.to_string();
        self.services.register(service, move |data| {
            let name = name.clone();
            async move {
                info!(service = %name, data = %data, "Service called");
                Ok(())
            }
        });
    }
}

impl Default for HomeRules {
    fn default() -> Self {
        Self::new()
    }
}

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

fn load_config(path: &Path) -> Result<RulesConfig> {
    let loaded = load_file(path).with_context(|| format!("loading {}", path.display()))?;
    for problem in &loaded.problems {
        error!(%problem, "Configuration problem, affected monitor not started");
    }
    Ok(loaded.config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let path = config_path();
    info!(path = %path.display(), "Starting home rules");
    let config = load_config(&path)?;
    if config.is_empty() {
        warn!("No monitors configured");
    }

    let host = HomeRules::new();
    for service in config.services() {
        host.register_logging_service(service);
    }

    let mut runtime = Runtime::new(host.signals.clone(), host.clock.clone());
    for monitor in build_monitors(&config, host.services.clone()) {
        runtime.register(monitor);
    }
    runtime.start().await;
    info!(monitors = runtime.monitor_count(), "Home rules initialized");

    let changes = host.bus.subscribe();
    tokio::spawn(feed::feed(BufReader::new(tokio::io::stdin()), host.signals.clone()));

    runtime
        .run(changes, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    info!("Shutting down...");
    Ok(())
}
