pub mod routes;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Environment;

// MODELS

#[derive(Debug, sqlx::FromRow)]
pub struct EnvironmentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EnvironmentRow> for Environment {
    fn from(row: EnvironmentRow) -> Self {
        Environment {
            id: row.id,
            project_id: row.project_id,
            key: row.key,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
