use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller identity handed to every document operation.
///
/// `user_id` is absent for service-to-service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub org_id: Uuid,
    pub user_id: Option<Uuid>,
}

impl IdentityContext {
    pub fn new(org_id: Uuid, user_id: Option<Uuid>) -> Self {
        Self { org_id, user_id }
    }

    pub fn service(org_id: Uuid) -> Self {
        Self {
            org_id,
            user_id: None,
        }
    }
}
