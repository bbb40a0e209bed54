//! API constants

/// Versioned prefix every document route is nested under.
pub const API_PREFIX: &str = "/api/v0";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "docvault=debug,tower_http=debug";
