use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use super::queries::{find_config, find_environment, find_flag, list_flag_configs};
use super::{environment_key, project_key, ConfigsQuery, EvaluateRequest};
use crate::error::{ApiError, NotFoundError};
use crate::evaluation::evaluate_flag;
use crate::models::ConfigListResponse;
use crate::routes::projects::ProjectRow;
use crate::routes::sdk_auth::{authenticate_project, ApiKey};
use crate::state::AppState;

/// Resolve the key's project and make sure it is the one the caller named.
async fn project_for_key(
    state: &AppState,
    api_key: &str,
    project_key: &str,
) -> Result<ProjectRow, ApiError> {
    let project = authenticate_project(&state.db, api_key).await?;
    if project.key != project_key {
        return Err(NotFoundError::Project(project_key.to_string()).into());
    }
    Ok(project)
}

/// Every flag config for one environment, as polled by SDK clients
pub async fn configs(
    State(state): State<AppState>,
    ApiKey(api_key): ApiKey,
    Query(query): Query<ConfigsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let project_key = project_key(query.project_key)?;
    let environment_key = environment_key(query.environment_key)?;

    let project = project_for_key(&state, &api_key, &project_key).await?;
    let environment = find_environment(&state.db, project.id, &environment_key).await?;
    let flags = list_flag_configs(&state.db, environment.id).await?;

    debug!(
        project = %project.key,
        environment = %environment.key,
        flags = flags.len(),
        "served flag configs"
    );

    Ok(Json(ConfigListResponse { flags }))
}

/// Evaluate one flag for one actor on the server
pub async fn evaluate(
    State(state): State<AppState>,
    ApiKey(api_key): ApiKey,
    body: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::bad_request("INVALID_REQUEST", rejection.body_text()))?;
    let request = request.checked()?;

    let project = project_for_key(&state, &api_key, &request.project_key).await?;
    let environment = find_environment(&state.db, project.id, &request.environment_key).await?;
    let flag = find_flag(&state.db, project.id, &request.flag_key).await?;
    let config = find_config(&state.db, &flag, &environment).await?;

    let result = evaluate_flag(&flag.key, &config, &request.actor);

    debug!(
        flag = %flag.key,
        environment = %environment.key,
        actor = %request.actor.id,
        reason = result.reason.as_str(),
        "evaluated flag"
    );

    Ok(Json(result))
}
