//! Application setup and initialization
//!
//! Builds the record store, the storage registry and the document service from
//! a [`Config`], then wires them into the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use docvault_core::{Config, StaticVendorSelector, VendorSelector};
use docvault_db::{DocumentRepository, InMemoryDocumentRepository, PgDocumentRepository};
use docvault_services::{DocumentService, DocumentServiceSettings};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment,
        vendor = %config.storage.vendor,
        "Configuration loaded and validated successfully"
    );

    let (repository, pool) = match &config.database_url {
        Some(url) => {
            let pool = database::setup_database(&config, url).await?;
            let repository: Arc<dyn DocumentRepository> =
                Arc::new(PgDocumentRepository::new(pool.clone()));
            (repository, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, document records are kept in memory only");
            let repository: Arc<dyn DocumentRepository> =
                Arc::new(InMemoryDocumentRepository::new());
            (repository, None)
        }
    };

    let storage = storage::setup_storage(&config).await?;

    let vendor_selector: Arc<dyn VendorSelector> =
        Arc::new(StaticVendorSelector(config.storage.vendor));

    let documents = DocumentService::new(
        repository,
        storage,
        vendor_selector.clone(),
        DocumentServiceSettings::from_config(&config),
    );

    let state = Arc::new(AppState::new(documents, vendor_selector, pool));
    let router = routes::build_router(state.clone(), config.max_upload_size_bytes);

    Ok((state, router))
}
