use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::EnvironmentRow;
use crate::error::{is_unique_violation, ApiError, NotFoundError};
use crate::models::environment::check_can_delete;
use crate::models::{Environment, EnvironmentInput};
use crate::routes::middleware_auth::Operator;
use crate::routes::projects::find_owned;
use crate::state::AppState;

fn key_conflict(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::conflict(
            "ENVIRONMENT_KEY_CONFLICT",
            "Environment key already exists in this project",
        )
    } else {
        err.into()
    }
}

async fn find_environment(
    state: &AppState,
    project_id: Uuid,
    environment_id: Uuid,
) -> Result<EnvironmentRow, ApiError> {
    sqlx::query_as::<_, EnvironmentRow>(
        r#"
        SELECT * FROM environments
        WHERE id = $1 AND project_id = $2
        "#,
    )
    .bind(environment_id)
    .bind(project_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| NotFoundError::Environment(environment_id.to_string()).into())
}

/// Create an environment, seeding a disabled config for every existing flag
pub async fn create(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<EnvironmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let mut tx = state.db.begin().await?;
    find_owned(&mut *tx, project_id, operator).await?;

    let environment = sqlx::query_as::<_, EnvironmentRow>(
        r#"
        INSERT INTO environments (project_id, key, name)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(payload.key.unwrap_or_default())
    .bind(payload.name.unwrap_or_default().trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(key_conflict)?;

    let seeded = sqlx::query(
        r#"
        INSERT INTO flag_environment_configs (flag_id, environment_id, enabled, default_value, gates)
        SELECT id, $1, FALSE, default_value, '[]'::jsonb
        FROM flags
        WHERE project_id = $2
        "#,
    )
    .bind(environment.id)
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        environment = %environment.key,
        %project_id,
        configs = seeded.rows_affected(),
        "environment created"
    );

    Ok((StatusCode::CREATED, Json(Environment::from(environment))))
}

/// List all environments for a project
pub async fn list(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;

    let environments = sqlx::query_as::<_, EnvironmentRow>(
        r#"
        SELECT * FROM environments
        WHERE project_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let response: Vec<Environment> = environments.into_iter().map(Environment::from).collect();
    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;
    let environment = find_environment(&state, project_id, environment_id).await?;
    Ok(Json(Environment::from(environment)))
}

pub async fn update(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EnvironmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    find_owned(&state.db, project_id, operator).await?;
    let existing: Environment = find_environment(&state, project_id, environment_id)
        .await?
        .into();

    let merged = payload.merged_onto(&existing);
    merged.validate()?;

    let environment = sqlx::query_as::<_, EnvironmentRow>(
        r#"
        UPDATE environments
        SET key = $1, name = $2, updated_at = NOW()
        WHERE id = $3 AND project_id = $4
        RETURNING *
        "#,
    )
    .bind(merged.key.unwrap_or_default())
    .bind(merged.name.unwrap_or_default().trim())
    .bind(environment_id)
    .bind(project_id)
    .fetch_one(&state.db)
    .await
    .map_err(key_conflict)?;

    Ok(Json(Environment::from(environment)))
}

/// Delete an environment and its configs. The last environment of a project cannot go.
pub async fn delete(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = state.db.begin().await?;

    // lock the project row so two concurrent deletes cannot both pass the count check
    sqlx::query("SELECT id FROM projects WHERE id = $1 AND created_by = $2 FOR UPDATE")
        .bind(project_id)
        .bind(operator)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| NotFoundError::Project(project_id.to_string()))?;

    let remaining =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM environments WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&mut *tx)
            .await?;

    let result = sqlx::query("DELETE FROM environments WHERE id = $1 AND project_id = $2")
        .bind(environment_id)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::Environment(environment_id.to_string()).into());
    }
    check_can_delete(remaining)?;

    tx.commit().await?;

    info!(%environment_id, %project_id, "environment deleted");
    Ok(StatusCode::NO_CONTENT)
}
