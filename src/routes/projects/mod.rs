pub mod routes;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{ApiError, NotFoundError};
use crate::models::Project;

// MODELS

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub api_key_prefix: String,
    pub api_key_hash: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            key: row.key,
            name: row.name,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Returned on create and key regeneration, the only times the plaintext key is visible.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithKey {
    #[serde(flatten)]
    pub project: Project,
    pub api_key: String,
}

// HELPER FUNCTIONS

/// Load a project owned by `operator`. Someone else's project reads as not found.
pub async fn find_owned<'e, E>(
    executor: E,
    project_id: Uuid,
    operator: Uuid,
) -> Result<ProjectRow, ApiError>
where
    E: PgExecutor<'e>,
{
    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT * FROM projects
        WHERE id = $1 AND created_by = $2
        "#,
    )
    .bind(project_id)
    .bind(operator)
    .fetch_optional(executor)
    .await?;

    project.ok_or_else(|| NotFoundError::Project(project_id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_with_key_is_flat() {
        let now = Utc::now();
        let body = ProjectWithKey {
            project: Project {
                id: Uuid::nil(),
                key: "storefront".to_string(),
                name: "Storefront".to_string(),
                created_by: Uuid::nil(),
                created_at: now,
                updated_at: now,
            },
            api_key: "ffk_abc".to_string(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["key"], "storefront");
        assert_eq!(json["apiKey"], "ffk_abc");
        assert!(json.get("apiKeyHash").is_none());
    }
}
