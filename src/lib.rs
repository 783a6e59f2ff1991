pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::{IndicatorCache, KeyValueStore};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::convert::Field;
use crate::core::refresh::{EPHEMERAL_STORE_ADVISORY, RefreshOrchestrator};
use crate::providers::CompositeSource;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    Show,
    Convert { field: Field, amount: f64 },
    Quota,
}

/// Wires the configured sources, the store and the clock into a refresh
/// orchestrator.
pub fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
) -> RefreshOrchestrator {
    let source = CompositeSource::from_config(&config.providers, config.retries);
    RefreshOrchestrator::new(
        Arc::new(source),
        IndicatorCache::new(store),
        clock,
        config.quota,
    )
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cotiza starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let opened = store::open_store(&config);
    let mut orchestrator = build_orchestrator(&config, opened.store, Arc::new(SystemClock));
    if !opened.persistent {
        orchestrator = orchestrator.with_storage_notice(EPHEMERAL_STORE_ADVISORY);
    }

    match command {
        AppCommand::Show => cli::show::run(&orchestrator).await,
        AppCommand::Convert { field, amount } => {
            cli::convert::run(&orchestrator, field, amount).await
        }
        AppCommand::Quota => cli::quota::run(&orchestrator).await,
    }
}
