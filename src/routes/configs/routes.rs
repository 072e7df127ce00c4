use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sqlx::{types::Json as JsonColumn, PgConnection};
use tracing::info;
use uuid::Uuid;

use super::{ConfigPath, ConfigRow, GatePath, NewGateRequest, ReorderGatesRequest};
use crate::error::{ApiError, NotFoundError};
use crate::gates::{insert_gate, remove_gate, reorder_gates};
use crate::models::{FlagConfigPatch, FlagEnvironmentConfig};
use crate::routes::flags::FlagRow;
use crate::routes::middleware_auth::Operator;
use crate::routes::projects::find_owned;
use crate::state::AppState;
use crate::values::ValueType;

/// Load a config together with its flag's value type. Inside a transaction the config row
/// stays locked until commit.
async fn load_config(
    conn: &mut PgConnection,
    path: &ConfigPath,
    operator: Uuid,
) -> Result<(FlagEnvironmentConfig, ValueType), ApiError> {
    find_owned(&mut *conn, path.project_id, operator).await?;

    let flag = sqlx::query_as::<_, FlagRow>("SELECT * FROM flags WHERE id = $1 AND project_id = $2")
        .bind(path.flag_id)
        .bind(path.project_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| NotFoundError::Flag(path.flag_id.to_string()))?;

    let config = sqlx::query_as::<_, ConfigRow>(
        r#"
        SELECT c.* FROM flag_environment_configs c
        JOIN environments e ON e.id = c.environment_id
        WHERE c.flag_id = $1 AND c.environment_id = $2 AND e.project_id = $3
        FOR UPDATE OF c
        "#,
    )
    .bind(path.flag_id)
    .bind(path.environment_id)
    .bind(path.project_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| NotFoundError::FlagEnvironmentConfig {
        flag: flag.key.clone(),
        environment: path.environment_id.to_string(),
    })?;

    Ok((config.into(), flag.value_type()?))
}

async fn save(
    conn: &mut PgConnection,
    config: &FlagEnvironmentConfig,
) -> Result<FlagEnvironmentConfig, ApiError> {
    let row = sqlx::query_as::<_, ConfigRow>(
        r#"
        UPDATE flag_environment_configs
        SET enabled = $1, default_value = $2, gates = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(config.enabled)
    .bind(JsonColumn(&config.default_value))
    .bind(JsonColumn(&config.gates))
    .bind(config.id)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

/// Read-modify-write one config inside a transaction. `change` must return a validated config.
async fn modify<F>(
    state: &AppState,
    path: &ConfigPath,
    operator: Uuid,
    change: F,
) -> Result<FlagEnvironmentConfig, ApiError>
where
    F: FnOnce(FlagEnvironmentConfig, ValueType) -> Result<FlagEnvironmentConfig, ApiError>,
{
    let mut tx = state.db.begin().await?;

    let (config, value_type) = load_config(&mut tx, path, operator).await?;
    let next = change(config, value_type)?;
    let saved = save(&mut tx, &next).await?;

    tx.commit().await?;
    Ok(saved)
}

pub async fn get(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<ConfigPath>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.db.acquire().await?;
    let (config, _) = load_config(&mut conn, &path, operator).await?;
    Ok(Json(config))
}

/// Replace any of `enabled`, `defaultValue` and `gates`. The result is validated as a whole.
pub async fn update(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<ConfigPath>,
    Json(patch): Json<FlagConfigPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let config = modify(&state, &path, operator, |config, value_type| {
        Ok(config.patched(patch, value_type)?)
    })
    .await?;

    info!(
        config = %config.id,
        enabled = config.enabled,
        gates = config.gates.len(),
        "config updated"
    );
    Ok(Json(config))
}

/// Flip the config's enabled state
pub async fn toggle(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<ConfigPath>,
) -> Result<impl IntoResponse, ApiError> {
    let config = modify(&state, &path, operator, |mut config, _| {
        config.enabled = !config.enabled;
        Ok(config)
    })
    .await?;

    info!(config = %config.id, enabled = config.enabled, "config toggled");
    Ok(Json(config))
}

/// Add a gate. Non-boolean gates go in front of a trailing boolean gate.
pub async fn add_gate(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<ConfigPath>,
    Json(request): Json<NewGateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let gate = request.into_gate();

    let config = modify(&state, &path, operator, |mut config, value_type| {
        config.gates = insert_gate(std::mem::take(&mut config.gates), gate);
        config.validate(value_type)?;
        Ok(config)
    })
    .await?;

    Ok(Json(config))
}

pub async fn reorder(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<ConfigPath>,
    Json(request): Json<ReorderGatesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = modify(&state, &path, operator, |mut config, _| {
        config.gates = reorder_gates(std::mem::take(&mut config.gates), &request.gate_ids)?;
        Ok(config)
    })
    .await?;

    Ok(Json(config))
}

pub async fn delete_gate(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(path): Path<GatePath>,
) -> Result<impl IntoResponse, ApiError> {
    let config = modify(&state, &path.config(), operator, |mut config, _| {
        config.gates = remove_gate(std::mem::take(&mut config.gates), &path.gate_id)?;
        Ok(config)
    })
    .await?;

    Ok(Json(config))
}
