use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, NotFoundError};
use crate::gates::Gate;
use crate::models::{FlagConfig, FlagEnvironmentConfig};
use crate::routes::configs::ConfigRow;
use crate::routes::environments::EnvironmentRow;
use crate::routes::flags::FlagRow;
use crate::values::FlagValue;

#[derive(Debug, sqlx::FromRow)]
struct FlagConfigRow {
    key: String,
    value_type: String,
    enabled: bool,
    default_value: Json<FlagValue>,
    gates: Json<Vec<Gate>>,
}

impl TryFrom<FlagConfigRow> for FlagConfig {
    type Error = ApiError;

    fn try_from(row: FlagConfigRow) -> Result<Self, Self::Error> {
        Ok(FlagConfig {
            key: row.key,
            value_type: row.value_type.parse()?,
            enabled: row.enabled,
            default_value: row.default_value.0,
            gates: row.gates.0,
        })
    }
}

pub async fn find_environment(
    pool: &PgPool,
    project_id: Uuid,
    key: &str,
) -> Result<EnvironmentRow, ApiError> {
    let environment = sqlx::query_as::<_, EnvironmentRow>(
        r#"
        SELECT * FROM environments
        WHERE project_id = $1 AND key = $2
        "#,
    )
    .bind(project_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    environment.ok_or_else(|| NotFoundError::Environment(key.to_string()).into())
}

pub async fn find_flag(pool: &PgPool, project_id: Uuid, key: &str) -> Result<FlagRow, ApiError> {
    let flag = sqlx::query_as::<_, FlagRow>(
        r#"
        SELECT * FROM flags
        WHERE project_id = $1 AND key = $2
        "#,
    )
    .bind(project_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    flag.ok_or_else(|| NotFoundError::Flag(key.to_string()).into())
}

pub async fn find_config(
    pool: &PgPool,
    flag: &FlagRow,
    environment: &EnvironmentRow,
) -> Result<FlagEnvironmentConfig, ApiError> {
    let config = sqlx::query_as::<_, ConfigRow>(
        r#"
        SELECT * FROM flag_environment_configs
        WHERE flag_id = $1 AND environment_id = $2
        "#,
    )
    .bind(flag.id)
    .bind(environment.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| NotFoundError::FlagEnvironmentConfig {
        flag: flag.key.clone(),
        environment: environment.key.clone(),
    })?;

    Ok(config.into())
}

/// Every flag's config in one environment, joined with the flag's key and type.
pub async fn list_flag_configs(
    pool: &PgPool,
    environment_id: Uuid,
) -> Result<Vec<FlagConfig>, ApiError> {
    let rows = sqlx::query_as::<_, FlagConfigRow>(
        r#"
        SELECT f.key, f.value_type, c.enabled, c.default_value, c.gates
        FROM flag_environment_configs c
        JOIN flags f ON f.id = c.flag_id
        WHERE c.environment_id = $1
        ORDER BY f.key ASC
        "#,
    )
    .bind(environment_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(FlagConfig::try_from).collect()
}
