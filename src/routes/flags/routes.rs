use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::types::Json as JsonColumn;
use tracing::info;
use uuid::Uuid;

use super::FlagRow;
use crate::error::{is_unique_violation, ApiError, NotFoundError};
use crate::models::{Flag, FlagInput, NewFlag};
use crate::routes::middleware_auth::Operator;
use crate::routes::projects::find_owned;
use crate::state::AppState;

fn key_conflict(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::conflict("FLAG_KEY_CONFLICT", "Flag key already exists in this project")
    } else {
        err.into()
    }
}

async fn find_flag(state: &AppState, project_id: Uuid, flag_id: Uuid) -> Result<Flag, ApiError> {
    let row = sqlx::query_as::<_, FlagRow>(
        r#"
        SELECT * FROM flags
        WHERE id = $1 AND project_id = $2
        "#,
    )
    .bind(flag_id)
    .bind(project_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| NotFoundError::Flag(flag_id.to_string()))?;

    row.try_into()
}

/// Create a flag, seeding a disabled config for it in every environment of the project
pub async fn create(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<FlagInput>,
) -> Result<impl IntoResponse, ApiError> {
    let new_flag = NewFlag::try_from(payload)?;

    let mut tx = state.db.begin().await?;
    find_owned(&mut *tx, project_id, operator).await?;

    let flag = sqlx::query_as::<_, FlagRow>(
        r#"
        INSERT INTO flags (project_id, key, name, value_type, default_value)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(&new_flag.key)
    .bind(&new_flag.name)
    .bind(new_flag.value_type.as_str())
    .bind(JsonColumn(&new_flag.default_value))
    .fetch_one(&mut *tx)
    .await
    .map_err(key_conflict)?;

    let seeded = sqlx::query(
        r#"
        INSERT INTO flag_environment_configs (flag_id, environment_id, enabled, default_value, gates)
        SELECT $1, id, FALSE, $2, '[]'::jsonb
        FROM environments
        WHERE project_id = $3
        "#,
    )
    .bind(flag.id)
    .bind(JsonColumn(&new_flag.default_value))
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        flag = %flag.key,
        %project_id,
        configs = seeded.rows_affected(),
        "flag created"
    );

    Ok((StatusCode::CREATED, Json(Flag::try_from(flag)?)))
}

/// List all flags for a project
pub async fn list(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;

    let rows = sqlx::query_as::<_, FlagRow>(
        r#"
        SELECT * FROM flags
        WHERE project_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let flags = rows
        .into_iter()
        .map(Flag::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(flags))
}

pub async fn get(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, flag_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;
    let flag = find_flag(&state, project_id, flag_id).await?;
    Ok(Json(flag))
}

/// Update a flag's name or default value. Key and value type are fixed.
pub async fn update(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, flag_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FlagInput>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;
    let existing = find_flag(&state, project_id, flag_id).await?;

    let merged = NewFlag::try_from(payload.merged_onto(&existing)?)?;

    let row = sqlx::query_as::<_, FlagRow>(
        r#"
        UPDATE flags
        SET name = $1, default_value = $2, updated_at = NOW()
        WHERE id = $3 AND project_id = $4
        RETURNING *
        "#,
    )
    .bind(&merged.name)
    .bind(JsonColumn(&merged.default_value))
    .bind(flag_id)
    .bind(project_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Flag::try_from(row)?))
}

/// Delete a flag (cascades to its environment configs)
pub async fn delete(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, flag_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;

    let result = sqlx::query("DELETE FROM flags WHERE id = $1 AND project_id = $2")
        .bind(flag_id)
        .bind(project_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::Flag(flag_id.to_string()).into());
    }

    info!(%flag_id, %project_id, "flag deleted");
    Ok(StatusCode::NO_CONTENT)
}
