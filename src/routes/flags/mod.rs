pub mod routes;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Flag;
use crate::values::{FlagValue, ValueType};

// MODELS

#[derive(Debug, sqlx::FromRow)]
pub struct FlagRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub name: String,
    pub value_type: String,
    pub default_value: Json<FlagValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlagRow {
    pub fn value_type(&self) -> Result<ValueType, ApiError> {
        Ok(self.value_type.parse::<ValueType>()?)
    }
}

impl TryFrom<FlagRow> for Flag {
    type Error = ApiError;

    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        let value_type = row.value_type()?;
        Ok(Flag {
            id: row.id,
            project_id: row.project_id,
            key: row.key,
            name: row.name,
            value_type,
            default_value: row.default_value.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
