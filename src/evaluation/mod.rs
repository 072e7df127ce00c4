use serde::{Deserialize, Serialize};

use crate::gates::Gate;
use crate::values::FlagValue;

// The entity a flag is evaluated for. Only `id` takes part in gate matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// Why an evaluation produced its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationReason {
    #[serde(rename = "flag not found")]
    FlagNotFound,
    #[serde(rename = "flag disabled")]
    FlagDisabled,
    #[serde(rename = "gate matched")]
    GateMatched,
    #[serde(rename = "default value")]
    DefaultValue,
}

impl EvaluationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationReason::FlagNotFound => "flag not found",
            EvaluationReason::FlagDisabled => "flag disabled",
            EvaluationReason::GateMatched => "gate matched",
            EvaluationReason::DefaultValue => "default value",
        }
    }
}

// Flag evaluation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub flag_key: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FlagValue>,
    pub reason: EvaluationReason,
}

impl EvaluationResult {
    /// Result for a key that has no config. Built by callers, never by [`evaluate_flag`].
    pub fn not_found(flag_key: &str) -> Self {
        Self {
            flag_key: flag_key.to_string(),
            enabled: false,
            value: None,
            reason: EvaluationReason::FlagNotFound,
        }
    }
}

/// The parts of an environment-scoped flag config the evaluator reads.
///
/// Implemented by the persisted `FlagEnvironmentConfig` and by the config list the SDK caches,
/// so server and client run the same evaluation.
pub trait EvaluationConfig {
    fn enabled(&self) -> bool;
    fn default_value(&self) -> &FlagValue;
    fn gates(&self) -> &[Gate];
}

/// Evaluate a flag for an actor against an already-resolved config.
///
/// 1. A disabled config returns its default value without looking at gates.
/// 2. Otherwise the first enabled gate matching the actor wins, in stored order.
/// 3. If nothing matches, the config's default value is returned and the flag is enabled.
///
/// This is a pure function of its inputs. A missing config is the caller's concern and is
/// reported with [`EvaluationResult::not_found`].
pub fn evaluate_flag<C>(flag_key: &str, config: &C, actor: &Actor) -> EvaluationResult
where
    C: EvaluationConfig + ?Sized,
{
    if !config.enabled() {
        return EvaluationResult {
            flag_key: flag_key.to_string(),
            enabled: false,
            value: Some(config.default_value().clone()),
            reason: EvaluationReason::FlagDisabled,
        };
    }

    if let Some(gate) = config.gates().iter().find(|gate| matches_gate(gate, actor)) {
        return EvaluationResult {
            flag_key: flag_key.to_string(),
            enabled: true,
            value: Some(gate.value().clone()),
            reason: EvaluationReason::GateMatched,
        };
    }

    EvaluationResult {
        flag_key: flag_key.to_string(),
        enabled: true,
        value: Some(config.default_value().clone()),
        reason: EvaluationReason::DefaultValue,
    }
}

/// Whether a single gate applies to an actor. Disabled gates never match.
pub fn matches_gate(gate: &Gate, actor: &Actor) -> bool {
    if !gate.enabled() {
        return false;
    }

    match gate {
        Gate::Boolean(_) => true,
        Gate::Actors(actors) => actors.actor_ids.contains(&actor.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestConfig {
        enabled: bool,
        default_value: FlagValue,
        gates: Vec<Gate>,
    }

    impl EvaluationConfig for TestConfig {
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

    fn first_match_gates() -> Vec<Gate> {
        vec![
            Gate::actors("a", false, ["u1", "u2"], "disabled"),
            Gate::actors("b", true, ["u1"], "v1"),
            Gate::boolean("c", true, "v2"),
        ]
    }

    #[test]
    fn test_disabled_flag_ignores_gates() {
        let config = TestConfig {
            enabled: false,
            default_value: FlagValue::from("off"),
            gates: vec![Gate::boolean("all", true, "on")],
        };

        let result = evaluate_flag("test-flag", &config, &Actor::new("user123"));
        assert!(!result.enabled);
        assert_eq!(result.value, Some(FlagValue::from("off")));
        assert_eq!(result.reason, EvaluationReason::FlagDisabled);
    }

    #[test]
    fn test_empty_gate_list_uses_default() {
        let config = TestConfig {
            enabled: true,
            default_value: FlagValue::Number(7.0),
            gates: vec![],
        };

        let result = evaluate_flag("test-flag", &config, &Actor::new("user123"));
        assert!(result.enabled);
        assert_eq!(result.value, Some(FlagValue::Number(7.0)));
        assert_eq!(result.reason, EvaluationReason::DefaultValue);
    }

    #[test]
    fn test_first_match_wins() {
        let config = TestConfig {
            enabled: true,
            default_value: FlagValue::from("default"),
            gates: first_match_gates(),
        };

        let result = evaluate_flag("test-flag", &config, &Actor::new("u1"));
        assert_eq!(result.value, Some(FlagValue::from("v1")));
        assert_eq!(result.reason, EvaluationReason::GateMatched);
        assert!(result.enabled);

        // u2 is only listed on the disabled gate, so the catch-all supplies the value
        let result = evaluate_flag("test-flag", &config, &Actor::new("u2"));
        assert_eq!(result.value, Some(FlagValue::from("v2")));
        assert_eq!(result.reason, EvaluationReason::GateMatched);
    }

    #[test]
    fn test_no_gate_matches() {
        let config = TestConfig {
            enabled: true,
            default_value: FlagValue::Bool(false),
            gates: vec![
                Gate::actors("a", true, ["u1"], true),
                Gate::boolean("b", false, true),
            ],
        };

        let result = evaluate_flag("test-flag", &config, &Actor::new("someone-else"));
        assert!(result.enabled);
        assert_eq!(result.value, Some(FlagValue::Bool(false)));
        assert_eq!(result.reason, EvaluationReason::DefaultValue);
    }

    #[test]
    fn test_matches_gate() {
        let actor = Actor::new("u1");
        assert!(matches_gate(&Gate::boolean("b", true, true), &actor));
        assert!(!matches_gate(&Gate::boolean("b", false, true), &actor));
        assert!(matches_gate(&Gate::actors("a", true, ["u1"], true), &actor));
        assert!(!matches_gate(&Gate::actors("a", true, ["u9"], true), &actor));
        assert!(!matches_gate(&Gate::actors("a", false, ["u1"], true), &actor));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let config = TestConfig {
            enabled: true,
            default_value: FlagValue::from("default"),
            gates: first_match_gates(),
        };
        let actor = Actor::new("u1");
        assert_eq!(
            evaluate_flag("k", &config, &actor),
            evaluate_flag("k", &config, &actor)
        );
    }

    #[test]
    fn test_result_wire_format() {
        let encoded = serde_json::to_value(EvaluationResult::not_found("missing")).unwrap();
        assert_eq!(
            encoded,
            json!({"flagKey": "missing", "enabled": false, "reason": "flag not found"})
        );
    }
}
