use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::evaluation::EvaluationConfig;
use crate::gates::{validate_gate_values, validate_gates, Gate, GateValidationError};
use crate::values::{FlagValue, ValueType, ValueTypeMismatch};

/// Per-(flag, environment) settings. This is what the evaluator consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEnvironmentConfig {
    pub id: Uuid,
    pub flag_id: Uuid,
    pub environment_id: Uuid,
    pub enabled: bool,
    pub default_value: FlagValue,
    pub gates: Vec<Gate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationConfig for FlagEnvironmentConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_value(&self) -> &FlagValue {
        &self.default_value
    }

    fn gates(&self) -> &[Gate] {
        &self.gates
    }
}

/// Wholesale or partial replacement of a config's settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagConfigPatch {
    pub enabled: Option<bool>,
    pub default_value: Option<FlagValue>,
    pub gates: Option<Vec<Gate>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("Config default value does not match the flag type: {0}")]
    DefaultValueType(#[source] ValueTypeMismatch),

    #[error(transparent)]
    Gates(#[from] GateValidationError),
}

impl FlagEnvironmentConfig {
    /// Apply a patch, returning the validated result. `value_type` is the owning flag's type.
    pub fn patched(
        &self,
        patch: FlagConfigPatch,
        value_type: ValueType,
    ) -> Result<FlagEnvironmentConfig, ConfigValidationError> {
        let mut next = self.clone();
        if let Some(enabled) = patch.enabled {
            next.enabled = enabled;
        }
        if let Some(default_value) = patch.default_value {
            next.default_value = default_value;
        }
        if let Some(gates) = patch.gates {
            next.gates = gates;
        }

        next.validate(value_type)?;
        Ok(next)
    }

    pub fn validate(&self, value_type: ValueType) -> Result<(), ConfigValidationError> {
        self.default_value
            .check_type(value_type)
            .map_err(ConfigValidationError::DefaultValueType)?;
        validate_gates(&self.gates)?;
        validate_gate_values(&self.gates, value_type)?;
        Ok(())
    }
}

/// One flag as served to SDKs: the environment config joined with its flag's key and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagConfig {
    pub key: String,
    pub value_type: ValueType,
    pub enabled: bool,
    pub default_value: FlagValue,
    #[serde(default)]
    pub gates: Vec<Gate>,
}

impl EvaluationConfig for FlagConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_value(&self) -> &FlagValue {
        &self.default_value
    }

    fn gates(&self) -> &[Gate] {
        &self.gates
    }
}

/// Body of `GET /api/v1/configs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigListResponse {
    pub flags: Vec<FlagConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FlagEnvironmentConfig {
        FlagEnvironmentConfig {
            id: Uuid::new_v4(),
            flag_id: Uuid::new_v4(),
            environment_id: Uuid::new_v4(),
            enabled: false,
            default_value: FlagValue::Bool(false),
            gates: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_applies_and_validates() {
        let patch = FlagConfigPatch {
            enabled: Some(true),
            gates: Some(vec![
                Gate::actors("beta", true, ["u1"], true),
                Gate::boolean("rest", true, false),
            ]),
            ..Default::default()
        };
        let next = config().patched(patch, ValueType::Boolean).unwrap();
        assert!(next.enabled);
        assert_eq!(next.gates.len(), 2);
    }

    #[test]
    fn test_patch_rejects_bad_gate_order() {
        let patch = FlagConfigPatch {
            gates: Some(vec![
                Gate::boolean("rest", true, false),
                Gate::actors("beta", true, ["u1"], true),
            ]),
            ..Default::default()
        };
        assert!(matches!(
            config().patched(patch, ValueType::Boolean),
            Err(ConfigValidationError::Gates(GateValidationError::BooleanGateNotLast(_)))
        ));
    }

    #[test]
    fn test_patch_rejects_wrong_value_types() {
        let patch = FlagConfigPatch {
            default_value: Some(FlagValue::Number(1.0)),
            ..Default::default()
        };
        assert!(matches!(
            config().patched(patch, ValueType::Boolean),
            Err(ConfigValidationError::DefaultValueType(_))
        ));

        let patch = FlagConfigPatch {
            gates: Some(vec![Gate::boolean("rest", true, "yes")]),
            ..Default::default()
        };
        assert!(matches!(
            config().patched(patch, ValueType::Boolean),
            Err(ConfigValidationError::Gates(GateValidationError::ValueType { .. }))
        ));
    }

    #[test]
    fn test_flag_config_wire_format() {
        let body = json!({
            "flags": [{
                "key": "new-checkout",
                "valueType": "boolean",
                "enabled": true,
                "defaultValue": false,
                "gates": [{"id": "g", "type": "actors", "enabled": true, "actorIds": ["u1"], "value": true}]
            }]
        });
        let parsed: ConfigListResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.flags[0].key, "new-checkout");
        assert_eq!(parsed.flags[0].default_value, FlagValue::Bool(false));
        assert_eq!(parsed.flags[0].gates.len(), 1);
    }
}
