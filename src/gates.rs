use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::values::{FlagValue, ValueType, ValueTypeMismatch};

/// A targeting rule inside a flag's environment config.
///
/// Gates are evaluated in list order and the first enabled gate that matches the actor
/// supplies the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Gate {
    /// Catch-all gate. Matches every actor while enabled; must be the last gate.
    Boolean(BooleanGate),
    /// Matches actors whose id is listed in `actor_ids`.
    Actors(ActorsGate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanGate {
    pub id: String,
    pub enabled: bool,
    pub value: FlagValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorsGate {
    pub id: String,
    pub enabled: bool,
    pub actor_ids: BTreeSet<String>,
    pub value: FlagValue,
}

impl Gate {
    pub fn boolean(id: impl Into<String>, enabled: bool, value: impl Into<FlagValue>) -> Gate {
        Gate::Boolean(BooleanGate {
            id: id.into(),
            enabled,
            value: value.into(),
        })
    }

    pub fn actors<I, S>(
        id: impl Into<String>,
        enabled: bool,
        actor_ids: I,
        value: impl Into<FlagValue>,
    ) -> Gate
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Gate::Actors(ActorsGate {
            id: id.into(),
            enabled,
            actor_ids: actor_ids.into_iter().map(Into::into).collect(),
            value: value.into(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Gate::Boolean(g) => &g.id,
            Gate::Actors(g) => &g.id,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Gate::Boolean(g) => g.enabled,
            Gate::Actors(g) => g.enabled,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match self {
            Gate::Boolean(g) => g.enabled = enabled,
            Gate::Actors(g) => g.enabled = enabled,
        }
    }

    pub fn value(&self) -> &FlagValue {
        match self {
            Gate::Boolean(g) => &g.value,
            Gate::Actors(g) => &g.value,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Gate::Boolean(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateValidationError {
    #[error("gate id is required")]
    MissingId,

    #[error("gate id '{0}' is used more than once")]
    DuplicateId(String),

    #[error("actors gate '{0}' must target at least one actor")]
    EmptyActors(String),

    #[error("only one boolean gate is allowed")]
    MultipleBooleanGates,

    #[error("boolean gate '{0}' must be the last gate")]
    BooleanGateNotLast(String),

    #[error("gate '{gate_id}' has the wrong value type: {source}")]
    ValueType {
        gate_id: String,
        #[source]
        source: ValueTypeMismatch,
    },

    #[error("gate order must list every existing gate exactly once")]
    ReorderMismatch,

    #[error("gate '{0}' not found")]
    GateNotFound(String),
}

/// Check the structural invariants of a gate list, reporting the first violation in list order.
pub fn validate_gates(gates: &[Gate]) -> Result<(), GateValidationError> {
    let mut seen_ids = HashSet::with_capacity(gates.len());
    let mut seen_boolean = false;
    let last_index = gates.len().saturating_sub(1);

    for (index, gate) in gates.iter().enumerate() {
        if gate.id().is_empty() {
            return Err(GateValidationError::MissingId);
        }

        if !seen_ids.insert(gate.id()) {
            return Err(GateValidationError::DuplicateId(gate.id().to_string()));
        }

        match gate {
            Gate::Actors(actors) if actors.actor_ids.is_empty() => {
                return Err(GateValidationError::EmptyActors(actors.id.clone()));
            }
            Gate::Actors(_) => {}
            Gate::Boolean(boolean) => {
                if seen_boolean {
                    return Err(GateValidationError::MultipleBooleanGates);
                }
                if index != last_index {
                    return Err(GateValidationError::BooleanGateNotLast(boolean.id.clone()));
                }
                seen_boolean = true;
            }
        }
    }

    Ok(())
}

/// Check every gate value against the owning flag's declared type.
pub fn validate_gate_values(
    gates: &[Gate],
    value_type: ValueType,
) -> Result<(), GateValidationError> {
    for gate in gates {
        gate.value()
            .check_type(value_type)
            .map_err(|source| GateValidationError::ValueType {
                gate_id: gate.id().to_string(),
                source,
            })?;
    }
    Ok(())
}

/// Add a gate, keeping a trailing boolean gate in last position.
///
/// A non-boolean gate added to a list that ends in a boolean gate is spliced in just before
/// it; anything else is appended.
pub fn insert_gate(mut gates: Vec<Gate>, new_gate: Gate) -> Vec<Gate> {
    let ends_in_boolean = gates.last().is_some_and(Gate::is_boolean);

    if ends_in_boolean && !new_gate.is_boolean() {
        let position = gates.len() - 1;
        gates.insert(position, new_gate);
    } else {
        gates.push(new_gate);
    }

    gates
}

/// Rearrange gates to follow `ordered_ids`, which must name every gate exactly once.
///
/// The result is validated, so a reorder that moves the boolean gate off the end is rejected.
pub fn reorder_gates(
    gates: Vec<Gate>,
    ordered_ids: &[String],
) -> Result<Vec<Gate>, GateValidationError> {
    if ordered_ids.len() != gates.len() {
        return Err(GateValidationError::ReorderMismatch);
    }

    let mut remaining: Vec<Option<Gate>> = gates.into_iter().map(Some).collect();
    let mut reordered = Vec::with_capacity(remaining.len());

    for id in ordered_ids {
        let slot = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|g| g.id() == id))
            .ok_or(GateValidationError::ReorderMismatch)?;
        if let Some(gate) = slot.take() {
            reordered.push(gate);
        }
    }

    validate_gates(&reordered)?;
    Ok(reordered)
}

/// Remove the gate with `gate_id`.
pub fn remove_gate(mut gates: Vec<Gate>, gate_id: &str) -> Result<Vec<Gate>, GateValidationError> {
    let position = gates
        .iter()
        .position(|g| g.id() == gate_id)
        .ok_or_else(|| GateValidationError::GateNotFound(gate_id.to_string()))?;
    gates.remove(position);
    Ok(gates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_well_formed_list() {
        let gates = vec![
            Gate::actors("a", true, ["u1"], true),
            Gate::actors("b", false, ["u2", "u3"], true),
            Gate::boolean("c", true, false),
        ];
        assert!(validate_gates(&gates).is_ok());
        assert!(validate_gates(&[]).is_ok());
    }

    #[test]
    fn test_rejects_boolean_gate_not_last() {
        let gates = vec![
            Gate::boolean("b", true, true),
            Gate::actors("a", true, ["u1"], true),
        ];
        assert_eq!(
            validate_gates(&gates),
            Err(GateValidationError::BooleanGateNotLast("b".to_string()))
        );
    }

    #[test]
    fn test_rejects_two_boolean_gates() {
        let gates = vec![Gate::boolean("b1", true, true), Gate::boolean("b2", true, false)];
        assert!(validate_gates(&gates).is_err());
    }

    #[test]
    fn test_rejects_empty_actor_set() {
        let gates = vec![Gate::actors("a", true, Vec::<String>::new(), true)];
        assert_eq!(
            validate_gates(&gates),
            Err(GateValidationError::EmptyActors("a".to_string()))
        );
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let gates = vec![
            Gate::actors("same", true, ["u1"], true),
            Gate::actors("same", true, ["u2"], true),
        ];
        assert_eq!(
            validate_gates(&gates),
            Err(GateValidationError::DuplicateId("same".to_string()))
        );
    }

    #[test]
    fn test_insert_before_trailing_boolean() {
        let gates = vec![
            Gate::actors("x", true, ["u1"], true),
            Gate::boolean("y", true, false),
        ];
        let gates = insert_gate(gates, Gate::actors("z", true, ["u2"], true));
        let ids: Vec<&str> = gates.iter().map(Gate::id).collect();
        assert_eq!(ids, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_insert_appends_otherwise() {
        let gates = vec![Gate::actors("x", true, ["u1"], true)];
        let gates = insert_gate(gates, Gate::boolean("y", true, false));
        let ids: Vec<&str> = gates.iter().map(Gate::id).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn test_reorder() {
        let gates = vec![
            Gate::actors("a", true, ["u1"], 1.0),
            Gate::actors("b", true, ["u2"], 2.0),
            Gate::boolean("c", true, 3.0),
        ];
        let order = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let reordered = reorder_gates(gates.clone(), &order).unwrap();
        assert_eq!(reordered[0].id(), "b");

        let bad = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(
            reorder_gates(gates.clone(), &bad),
            Err(GateValidationError::BooleanGateNotLast("c".to_string()))
        );

        let partial = vec!["a".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(
            reorder_gates(gates, &partial),
            Err(GateValidationError::ReorderMismatch)
        );
    }

    #[test]
    fn test_remove_gate() {
        let gates = vec![Gate::actors("a", true, ["u1"], true)];
        assert!(remove_gate(gates.clone(), "a").unwrap().is_empty());
        assert_eq!(
            remove_gate(gates, "zzz"),
            Err(GateValidationError::GateNotFound("zzz".to_string()))
        );
    }

    #[test]
    fn test_gate_values_checked_against_flag_type() {
        let gates = vec![Gate::actors("a", true, ["u1"], "yes")];
        let err = validate_gate_values(&gates, ValueType::Boolean).unwrap_err();
        assert!(
            matches!(err, GateValidationError::ValueType { ref gate_id, .. } if gate_id == "a")
        );
        assert!(validate_gate_values(&gates, ValueType::String).is_ok());
    }

    #[test]
    fn test_wire_format() {
        let gate: Gate = serde_json::from_value(json!({
            "id": "g1",
            "type": "actors",
            "enabled": true,
            "actorIds": ["u1", "u2"],
            "value": "blue"
        }))
        .unwrap();
        assert_eq!(gate, Gate::actors("g1", true, ["u1", "u2"], "blue"));

        let encoded = serde_json::to_value(Gate::boolean("g2", false, true)).unwrap();
        assert_eq!(
            encoded,
            json!({"type": "boolean", "id": "g2", "enabled": false, "value": true})
        );
    }
}
