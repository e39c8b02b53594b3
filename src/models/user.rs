use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The root aggregate. Owns the collection and decks; created at
/// registration and never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
