/// Organization read model
///
/// Organizations are referenced by profiles but managed elsewhere; only the
/// system-admin organizations view reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gateway table holding organization rows
pub const ORGANIZATIONS_TABLE: &str = "organizations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
