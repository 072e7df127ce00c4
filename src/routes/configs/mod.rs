pub mod routes;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::gates::Gate;
use crate::models::FlagEnvironmentConfig;
use crate::values::FlagValue;

// MODELS

#[derive(Debug, sqlx::FromRow)]
pub struct ConfigRow {
    pub id: Uuid,
    pub flag_id: Uuid,
    pub environment_id: Uuid,
    pub enabled: bool,
    pub default_value: Json<FlagValue>,
    pub gates: Json<Vec<Gate>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigRow> for FlagEnvironmentConfig {
    fn from(row: ConfigRow) -> Self {
        FlagEnvironmentConfig {
            id: row.id,
            flag_id: row.flag_id,
            environment_id: row.environment_id,
            enabled: row.enabled,
            default_value: row.default_value.0,
            gates: row.gates.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigPath {
    pub project_id: Uuid,
    pub flag_id: Uuid,
    pub environment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GatePath {
    pub project_id: Uuid,
    pub flag_id: Uuid,
    pub environment_id: Uuid,
    pub gate_id: String,
}

impl GatePath {
    pub fn config(&self) -> ConfigPath {
        ConfigPath {
            project_id: self.project_id,
            flag_id: self.flag_id,
            environment_id: self.environment_id,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Body of `POST .../gates`. The id is generated when omitted.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NewGateRequest {
    Boolean {
        id: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        value: FlagValue,
    },
    #[serde(rename_all = "camelCase")]
    Actors {
        id: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        actor_ids: Vec<String>,
        value: FlagValue,
    },
}

impl NewGateRequest {
    pub fn into_gate(self) -> Gate {
        let fresh_id = |id: Option<String>| {
            id.filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string())
        };

        match self {
            NewGateRequest::Boolean { id, enabled, value } => {
                Gate::boolean(fresh_id(id), enabled, value)
            }
            NewGateRequest::Actors {
                id,
                enabled,
                actor_ids,
                value,
            } => Gate::actors(fresh_id(id), enabled, actor_ids, value),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderGatesRequest {
    pub gate_ids: Vec<String>,
}
