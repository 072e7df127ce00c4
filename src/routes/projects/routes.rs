// src/routes/projects/routes.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::{find_owned, ProjectRow, ProjectWithKey};
use crate::error::{is_unique_violation, ApiError, NotFoundError};
use crate::models::{Project, ProjectInput};
use crate::routes::middleware_auth::Operator;
use crate::routes::sdk_auth::{api_key_prefix, generate_api_key, hash_api_key};
use crate::state::AppState;

const DEFAULT_ENVIRONMENT_KEY: &str = "production";
const DEFAULT_ENVIRONMENT_NAME: &str = "Production";

fn key_conflict(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::conflict("PROJECT_KEY_CONFLICT", "Project key already exists")
    } else {
        err.into()
    }
}

/// Generate a fresh API key, returning `(plaintext, prefix, hash)`.
async fn new_api_key() -> Result<(String, String, String), ApiError> {
    let api_key = generate_api_key();
    let prefix = api_key_prefix(&api_key)
        .ok_or_else(|| ApiError::internal("generated API key is shorter than its prefix"))?
        .to_string();

    let to_hash = api_key.clone();
    let hash = tokio::task::spawn_blocking(move || hash_api_key(&to_hash))
        .await
        .map_err(ApiError::internal)??;

    Ok((api_key, prefix, hash))
}

// HANDLERS

/// Create a project together with its default `production` environment
pub async fn create(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Json(payload): Json<ProjectInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let key = payload.key.unwrap_or_default();
    let name = payload.name.unwrap_or_default().trim().to_string();

    let (api_key, prefix, hash) = new_api_key().await?;

    let mut tx = state.db.begin().await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        INSERT INTO projects (key, name, api_key_prefix, api_key_hash, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&key)
    .bind(&name)
    .bind(&prefix)
    .bind(&hash)
    .bind(operator)
    .fetch_one(&mut *tx)
    .await
    .map_err(key_conflict)?;

    sqlx::query(
        r#"
        INSERT INTO environments (project_id, key, name)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(project.id)
    .bind(DEFAULT_ENVIRONMENT_KEY)
    .bind(DEFAULT_ENVIRONMENT_NAME)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(project = %project.key, %operator, "project created");

    let response = ProjectWithKey {
        project: project.into(),
        api_key,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List all projects owned by the operator
pub async fn list(
    State(state): State<AppState>,
    Operator(operator): Operator,
) -> Result<impl IntoResponse, ApiError> {
    let projects = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT * FROM projects
        WHERE created_by = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(operator)
    .fetch_all(&state.db)
    .await?;

    let response: Vec<Project> = projects.into_iter().map(Project::from).collect();
    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = find_owned(&state.db, project_id, operator).await?;
    Ok(Json(Project::from(project)))
}

/// Update a project. The patch is validated against the merged project.
pub async fn update(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<ProjectInput>,
) -> Result<impl IntoResponse, ApiError> {
    let existing: Project = find_owned(&state.db, project_id, operator).await?.into();

    let merged = payload.merged_onto(&existing);
    merged.validate()?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        UPDATE projects
        SET key = $1, name = $2, updated_at = NOW()
        WHERE id = $3 AND created_by = $4
        RETURNING *
        "#,
    )
    .bind(merged.key.unwrap_or_default())
    .bind(merged.name.unwrap_or_default().trim())
    .bind(project_id)
    .bind(operator)
    .fetch_one(&state.db)
    .await
    .map_err(key_conflict)?;

    Ok(Json(Project::from(project)))
}

/// Delete a project (cascades to its environments, flags and configs)
pub async fn delete(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        r#"
        DELETE FROM projects
        WHERE id = $1 AND created_by = $2
        "#,
    )
    .bind(project_id)
    .bind(operator)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::Project(project_id.to_string()).into());
    }

    info!(%project_id, %operator, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the project's API key. The old key stops working immediately.
pub async fn regenerate_key(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (api_key, prefix, hash) = new_api_key().await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        UPDATE projects
        SET api_key_prefix = $1, api_key_hash = $2, updated_at = NOW()
        WHERE id = $3 AND created_by = $4
        RETURNING *
        "#,
    )
    .bind(&prefix)
    .bind(&hash)
    .bind(project_id)
    .bind(operator)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| NotFoundError::Project(project_id.to_string()))?;

    info!(project = %project.key, "API key regenerated");

    Ok(Json(ProjectWithKey {
        project: project.into(),
        api_key,
    }))
}
