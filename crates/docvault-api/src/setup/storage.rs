//! Storage setup and initialization

use anyhow::{Context, Result};
use docvault_core::Config;
use docvault_services::{create_registry, StorageRegistry};
use std::sync::Arc;

/// Build one adapter per configured vendor.
///
/// The configured default vendor must be among them, otherwise new documents
/// could never be written.
pub async fn setup_storage(config: &Config) -> Result<Arc<StorageRegistry>> {
    tracing::info!("Initializing storage adapters...");
    let registry = create_registry(&config.storage)
        .await
        .context("Failed to initialize storage adapters")?;

    registry
        .get(config.storage.vendor)
        .with_context(|| format!("Default vendor {} is not configured", config.storage.vendor))?;

    let vendors: Vec<String> = registry.vendors().iter().map(|v| v.to_string()).collect();
    tracing::info!(
        vendors = %vendors.join(","),
        default_vendor = %config.storage.vendor,
        "Storage adapters initialized"
    );

    Ok(Arc::new(registry))
}
