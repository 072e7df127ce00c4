pub mod queries;
pub mod routes;

use serde::Deserialize;

use crate::error::ApiError;
use crate::evaluation::Actor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigsQuery {
    pub project_key: Option<String>,
    pub environment_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorBody {
    pub id: Option<String>,
}

/// Body of `POST /api/v1/flags/evaluate` as received. Every field is optional here so a
/// missing one can be reported with its own error code.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub project_key: Option<String>,
    pub environment_key: Option<String>,
    pub flag_key: Option<String>,
    pub actor: Option<ActorBody>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub project_key: String,
    pub environment_key: String,
    pub flag_key: String,
    pub actor: Actor,
}

fn required(value: Option<String>, code: &'static str, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(code, message))
}

pub fn project_key(value: Option<String>) -> Result<String, ApiError> {
    required(value, "MISSING_PROJECT_KEY", "projectKey is required")
}

pub fn environment_key(value: Option<String>) -> Result<String, ApiError> {
    required(value, "MISSING_ENVIRONMENT_KEY", "environmentKey is required")
}

impl EvaluateRequest {
    /// Check required fields in wire order, reporting the first one missing.
    pub fn checked(self) -> Result<Evaluation, ApiError> {
        let project_key = project_key(self.project_key)?;
        let environment_key = environment_key(self.environment_key)?;
        let flag_key = required(self.flag_key, "MISSING_FLAG_KEY", "flagKey is required")?;
        let actor_id = required(
            self.actor.and_then(|a| a.id),
            "MISSING_ACTOR",
            "actor with a non-empty id is required",
        )?;

        Ok(Evaluation {
            project_key,
            environment_key,
            flag_key,
            actor: Actor::new(actor_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> EvaluateRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_complete_request() {
        let evaluation = request(json!({
            "projectKey": "storefront",
            "environmentKey": "production",
            "flagKey": "new-checkout",
            "actor": {"id": "user-1"}
        }))
        .checked()
        .unwrap();

        assert_eq!(evaluation.flag_key, "new-checkout");
        assert_eq!(evaluation.actor, Actor::new("user-1"));
    }

    #[test]
    fn test_first_missing_field_wins() {
        let err = request(json!({})).checked().unwrap_err();
        assert_eq!(err.code, "MISSING_PROJECT_KEY");

        let err = request(json!({"projectKey": "p"})).checked().unwrap_err();
        assert_eq!(err.code, "MISSING_ENVIRONMENT_KEY");

        let err = request(json!({"projectKey": "p", "environmentKey": "e", "actor": {"id": "u"}}))
            .checked()
            .unwrap_err();
        assert_eq!(err.code, "MISSING_FLAG_KEY");
    }

    #[test]
    fn test_actor_needs_an_id() {
        let base = json!({"projectKey": "p", "environmentKey": "e", "flagKey": "f"});

        let err = request(base.clone()).checked().unwrap_err();
        assert_eq!(err.code, "MISSING_ACTOR");

        let mut empty_id = base;
        empty_id["actor"] = json!({"id": ""});
        let err = request(empty_id).checked().unwrap_err();
        assert_eq!(err.code, "MISSING_ACTOR");
        assert_eq!(err.status.as_u16(), 400);
    }
}
