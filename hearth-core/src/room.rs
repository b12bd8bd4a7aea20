use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable room on the property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
