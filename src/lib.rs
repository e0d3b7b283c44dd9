pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::RateCache;
use crate::core::config::AppConfig;
use crate::core::manager::RateManager;
use crate::store::backup::BackupFile;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Rate,
    Quote { cost_price: f64, shipping_cost: f64 },
}

/// Loads the config file, or built-in defaults, and applies environment
/// overrides on top.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let config = config.apply_env()?;
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub fn build_manager(config: &AppConfig) -> Result<Arc<RateManager>> {
    let source = providers::build_source(&config.source).context("Failed to build rate source")?;
    let cache = RateCache::new(BackupFile::new(config.backup_path()?));
    let policy = config.refresh.to_policy()?;
    Ok(Arc::new(RateManager::new(source, cache, policy)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = build_manager(&config)?;

    match command {
        AppCommand::Serve => {
            info!("Naira price server starting...");
            if manager.warm_up().await.is_none() {
                info!("Starting without an exchange rate, requests will trigger a fetch");
            }
            let refresher = manager.spawn_refresher();
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let result = api::serve(Arc::clone(&manager), &addr).await;
            refresher.abort();
            result
        }
        AppCommand::Rate => cli::rate::run(&manager).await,
        AppCommand::Quote {
            cost_price,
            shipping_cost,
        } => cli::quote::run(&manager, cost_price, shipping_cost).await,
    }
}
