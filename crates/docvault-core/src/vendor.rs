//! Active storage vendor resolution.
//!
//! The document service asks a [`VendorSelector`] once per placeholder creation.
//! The answer is stamped onto the record, so later changes to the active vendor
//! never affect existing documents or operations already in flight.

use tokio::sync::watch;

use crate::storage_types::StorageVendor;

pub trait VendorSelector: Send + Sync {
    /// Vendor that new documents should be stored with.
    fn active_vendor(&self) -> StorageVendor;
}

/// Fixed vendor, taken from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct StaticVendorSelector(pub StorageVendor);

impl VendorSelector for StaticVendorSelector {
    fn active_vendor(&self) -> StorageVendor {
        self.0
    }
}

/// Vendor that can be switched at runtime through the paired [`watch::Sender`].
#[derive(Debug, Clone)]
pub struct WatchedVendorSelector {
    rx: watch::Receiver<StorageVendor>,
}

impl WatchedVendorSelector {
    pub fn new(initial: StorageVendor) -> (Self, watch::Sender<StorageVendor>) {
        let (tx, rx) = watch::channel(initial);
        (Self { rx }, tx)
    }
}

impl VendorSelector for WatchedVendorSelector {
    fn active_vendor(&self) -> StorageVendor {
        *self.rx.borrow()
    }
}
