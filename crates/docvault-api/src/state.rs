//! Application state shared by every handler.

use docvault_core::VendorSelector;
use docvault_services::DocumentService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentService,
    pub vendor_selector: Arc<dyn VendorSelector>,
    /// `None` when running on the in-memory record store.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        documents: DocumentService,
        vendor_selector: Arc<dyn VendorSelector>,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            documents,
            vendor_selector,
            pool,
        }
    }
}
