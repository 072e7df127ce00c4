use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{check_name, overlay, NameProblem};
use crate::keys::{validate_key, KeyError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project fields as supplied on create, or as a patch on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub key: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectValidationError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Project name is required")]
    NameRequired,

    #[error("Project name must be 200 characters or less")]
    NameTooLong,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        validate_key(self.key.as_deref().unwrap_or_default(), "Project")?;

        check_name(self.name.as_deref()).map_err(|problem| match problem {
            NameProblem::Required => ProjectValidationError::NameRequired,
            NameProblem::TooLong => ProjectValidationError::NameTooLong,
        })
    }

    /// The entity an update would produce.
    pub fn merged_onto(self, existing: &Project) -> ProjectInput {
        ProjectInput {
            key: overlay(&existing.key, self.key),
            name: overlay(&existing.name, self.name),
        }
    }
}
