//! Sync command for fit-sheets

use crate::client::FitClient;
use crate::config::Settings;
use crate::error::Result;
use crate::storage::{JsonTabStore, Tab};
use crate::sync::{SyncEngine, SyncOptions};

/// Run the sync pipeline for one tab or all of them
pub async fn run(settings: &Settings, days: u32, tab: Option<Tab>, dry_run: bool) -> Result<()> {
    let token = settings.require_token()?.clone();
    let store = JsonTabStore::open(&settings.store_dir)?;
    println!("Using store: {}", store.base_path().display());

    let opts = SyncOptions {
        days,
        tabs: tab.map(|t| vec![t]).unwrap_or_else(|| Tab::ALL.to_vec()),
        dry_run,
        today: None,
    };

    if dry_run {
        println!("Dry run mode - no changes will be made");
    }

    let engine = SyncEngine::new(FitClient::new()?, token, store, settings.timezone);
    let stats = engine.run(&opts).await?;
    println!("\nSync complete:\n{}", stats);

    Ok(())
}
