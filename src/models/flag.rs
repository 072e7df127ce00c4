use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{check_name, overlay, NameProblem};
use crate::keys::{validate_key, KeyError};
use crate::values::{FlagValue, ValueType, ValueTypeMismatch};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub name: String,
    pub value_type: ValueType,
    pub default_value: FlagValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagInput {
    pub key: Option<String>,
    pub name: Option<String>,
    pub value_type: Option<ValueType>,
    pub default_value: Option<FlagValue>,
}

/// A flag that passed validation and is ready to insert.
///
/// Only obtainable through [`NewFlag::try_from`], so `default_value` always conforms to
/// `value_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlag {
    pub key: String,
    pub name: String,
    pub value_type: ValueType,
    pub default_value: FlagValue,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlagValidationError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Flag name is required")]
    NameRequired,

    #[error("Flag name must be 200 characters or less")]
    NameTooLong,

    #[error("Flag value type is required")]
    ValueTypeRequired,

    #[error("Flag default value is required")]
    DefaultValueRequired,

    #[error("Flag default value does not match its value type: {0}")]
    DefaultValueType(#[source] ValueTypeMismatch),

    #[error("Flag {0} cannot be changed after creation")]
    Immutable(&'static str),
}

impl FlagInput {
    pub fn validate(&self) -> Result<(), FlagValidationError> {
        validate_key(self.key.as_deref().unwrap_or_default(), "Flag")?;

        check_name(self.name.as_deref()).map_err(|problem| match problem {
            NameProblem::Required => FlagValidationError::NameRequired,
            NameProblem::TooLong => FlagValidationError::NameTooLong,
        })?;

        let value_type = self.value_type.ok_or(FlagValidationError::ValueTypeRequired)?;

        let default_value = self
            .default_value
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or(FlagValidationError::DefaultValueRequired)?;

        default_value
            .check_type(value_type)
            .map_err(FlagValidationError::DefaultValueType)
    }

    /// Overlay this patch on an existing flag. Key and value type are fixed at creation.
    pub fn merged_onto(self, existing: &Flag) -> Result<FlagInput, FlagValidationError> {
        if self.key.as_ref().is_some_and(|k| *k != existing.key) {
            return Err(FlagValidationError::Immutable("key"));
        }
        if self.value_type.is_some_and(|vt| vt != existing.value_type) {
            return Err(FlagValidationError::Immutable("value type"));
        }

        Ok(FlagInput {
            key: Some(existing.key.clone()),
            name: overlay(&existing.name, self.name),
            value_type: Some(existing.value_type),
            default_value: overlay(&existing.default_value, self.default_value),
        })
    }
}

impl TryFrom<FlagInput> for NewFlag {
    type Error = FlagValidationError;

    fn try_from(input: FlagInput) -> Result<Self, Self::Error> {
        input.validate()?;

        match input {
            FlagInput {
                key: Some(key),
                name: Some(name),
                value_type: Some(value_type),
                default_value: Some(default_value),
            } => Ok(NewFlag {
                key,
                name: name.trim().to_string(),
                value_type,
                default_value,
            }),
            _ => Err(FlagValidationError::DefaultValueRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FlagInput {
        FlagInput {
            key: Some("new-checkout".to_string()),
            name: Some("New checkout".to_string()),
            value_type: Some(ValueType::Boolean),
            default_value: Some(FlagValue::Bool(false)),
        }
    }

    fn existing() -> Flag {
        Flag {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            key: "new-checkout".to_string(),
            name: "New checkout".to_string(),
            value_type: ValueType::Boolean,
            default_value: FlagValue::Bool(false),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_flag() {
        let flag = NewFlag::try_from(input()).unwrap();
        assert_eq!(flag.key, "new-checkout");
        assert_eq!(flag.value_type, ValueType::Boolean);
    }

    #[test]
    fn test_required_fields() {
        let mut missing_type = input();
        missing_type.value_type = None;
        assert_eq!(
            missing_type.validate(),
            Err(FlagValidationError::ValueTypeRequired)
        );

        let mut missing_default = input();
        missing_default.default_value = None;
        assert_eq!(
            missing_default.validate(),
            Err(FlagValidationError::DefaultValueRequired)
        );

        let mut null_default = input();
        null_default.default_value = Some(FlagValue::Json(serde_json::Value::Null));
        assert_eq!(
            null_default.validate(),
            Err(FlagValidationError::DefaultValueRequired)
        );
    }

    #[test]
    fn test_default_value_must_match_type() {
        let mut wrong = input();
        wrong.default_value = Some(FlagValue::from("false"));
        assert!(matches!(
            wrong.validate(),
            Err(FlagValidationError::DefaultValueType(_))
        ));
    }

    #[test]
    fn test_default_value_false_is_present() {
        // false and 0 are real values, not missing ones
        let mut zero = input();
        zero.value_type = Some(ValueType::Number);
        zero.default_value = Some(FlagValue::Number(0.0));
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_update_merges_before_validating() {
        let patch = FlagInput {
            name: Some(String::new()),
            ..Default::default()
        };
        let merged = patch.merged_onto(&existing()).unwrap();
        assert_eq!(merged.validate(), Err(FlagValidationError::NameRequired));

        let patch = FlagInput {
            default_value: Some(FlagValue::Bool(true)),
            ..Default::default()
        };
        assert!(patch.merged_onto(&existing()).unwrap().validate().is_ok());
    }

    #[test]
    fn test_key_and_type_are_immutable() {
        let patch = FlagInput {
            key: Some("other-key".to_string()),
            ..Default::default()
        };
        assert_eq!(
            patch.merged_onto(&existing()).unwrap_err(),
            FlagValidationError::Immutable("key")
        );

        let patch = FlagInput {
            value_type: Some(ValueType::String),
            ..Default::default()
        };
        assert!(patch.merged_onto(&existing()).is_err());
    }
}
