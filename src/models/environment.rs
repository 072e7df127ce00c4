use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{check_name, overlay, NameProblem};
use crate::keys::{validate_key, KeyError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInput {
    pub key: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentValidationError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Environment name is required")]
    NameRequired,

    #[error("Environment name must be 200 characters or less")]
    NameTooLong,

    #[error("A project must keep at least one environment")]
    LastEnvironment,
}

impl EnvironmentInput {
    pub fn validate(&self) -> Result<(), EnvironmentValidationError> {
        validate_key(self.key.as_deref().unwrap_or_default(), "Environment")?;

        check_name(self.name.as_deref()).map_err(|problem| match problem {
            NameProblem::Required => EnvironmentValidationError::NameRequired,
            NameProblem::TooLong => EnvironmentValidationError::NameTooLong,
        })
    }

    pub fn merged_onto(self, existing: &Environment) -> EnvironmentInput {
        EnvironmentInput {
            key: overlay(&existing.key, self.key),
            name: overlay(&existing.name, self.name),
        }
    }
}

/// Refuse to delete the only environment left in a project.
pub fn check_can_delete(remaining_in_project: i64) -> Result<(), EnvironmentValidationError> {
    if remaining_in_project <= 1 {
        return Err(EnvironmentValidationError::LastEnvironment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_environment() {
        let ok = EnvironmentInput {
            key: Some("production".to_string()),
            name: Some("Production".to_string()),
        };
        assert!(ok.validate().is_ok());

        let uppercase = EnvironmentInput {
            key: Some("Production".to_string()),
            name: Some("Production".to_string()),
        };
        assert!(matches!(
            uppercase.validate(),
            Err(EnvironmentValidationError::Key(KeyError::InvalidFormat { .. }))
        ));

        let long_name = EnvironmentInput {
            key: Some("staging".to_string()),
            name: Some("s".repeat(201)),
        };
        assert_eq!(
            long_name.validate(),
            Err(EnvironmentValidationError::NameTooLong)
        );
    }

    #[test]
    fn test_merged_key_change_is_validated() {
        let existing = Environment {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            key: "staging".to_string(),
            name: "Staging".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let patch = EnvironmentInput {
            key: Some("x".to_string()),
            name: None,
        };
        assert!(patch.merged_onto(&existing).validate().is_err());
    }

    #[test]
    fn test_last_environment_cannot_be_deleted() {
        assert_eq!(
            check_can_delete(1),
            Err(EnvironmentValidationError::LastEnvironment)
        );
        assert!(check_can_delete(2).is_ok());
    }
}
