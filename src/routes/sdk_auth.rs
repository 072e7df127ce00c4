use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::warn;

use crate::error::ApiError;
use crate::routes::projects::ProjectRow;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Characters of the key stored in clear for lookup, e.g. `ffk_a1B2c3D4`.
const API_KEY_PREFIX_LEN: usize = 12;

/// Raw `X-API-Key` header value. Rejects with `MISSING_API_KEY` when absent or blank.
pub struct ApiKey(pub String);

impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| ApiKey(v.to_string()))
            .ok_or_else(|| ApiError::unauthorized("MISSING_API_KEY", "API key is required"))
    }
}

/// Generate a project API key.
/// Format: "ffk_" + 32 random alphanumeric characters
pub fn generate_api_key() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const KEY_LENGTH: usize = 32;

    let mut rng = rand::thread_rng();
    let key: String = (0..KEY_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("ffk_{}", key)
}

pub fn api_key_prefix(key: &str) -> Option<&str> {
    key.get(..API_KEY_PREFIX_LEN)
}

pub fn hash_api_key(key: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("failed to hash API key: {e}")))
}

pub fn verify_api_key(key: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(key.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored API key hash is malformed");
            false
        }
    }
}

/// Resolve the project an API key belongs to, or fail with `INVALID_API_KEY`.
pub async fn authenticate_project(db: &PgPool, api_key: &str) -> Result<ProjectRow, ApiError> {
    let invalid = || ApiError::unauthorized("INVALID_API_KEY", "Invalid API key");

    let prefix = api_key_prefix(api_key).ok_or_else(invalid)?;

    let candidates = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT * FROM projects WHERE api_key_prefix = $1
        "#,
    )
    .bind(prefix)
    .fetch_all(db)
    .await?;

    if candidates.is_empty() {
        return Err(invalid());
    }

    // argon2 verification is deliberately slow, keep it off the async workers
    let key = api_key.to_string();
    let matched = tokio::task::spawn_blocking(move || {
        candidates
            .into_iter()
            .find(|project| verify_api_key(&key, &project.api_key_hash))
    })
    .await
    .map_err(ApiError::internal)?;

    matched.ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<ApiKey, ApiError> {
        let mut request = Request::builder();
        if let Some(value) = header {
            request = request.header(API_KEY_HEADER, value);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        ApiKey::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_api_key_header_is_trimmed() {
        let ApiKey(key) = extract(Some("  ffk_abc123  ")).await.unwrap();
        assert_eq!(key, "ffk_abc123");
    }

    #[tokio::test]
    async fn test_missing_or_blank_api_key_is_rejected() {
        for header in [None, Some(""), Some("   ")] {
            let err = extract(header).await.err().unwrap();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED, "header {header:?}");
            assert_eq!(err.code, "MISSING_API_KEY", "header {header:?}");
        }
    }

    #[test]
    fn test_generate_api_key() {
        let key1 = generate_api_key();
        let key2 = generate_api_key();

        assert!(key1.starts_with("ffk_"));
        assert_eq!(key1.len(), 36); // "ffk_" (4) + 32 chars
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(api_key_prefix("ffk_abcdefgh12345"), Some("ffk_abcdefgh"));
        assert_eq!(api_key_prefix("short"), None);
    }

    #[test]
    fn test_hash_and_verify() {
        let key = generate_api_key();
        let hash = hash_api_key(&key).unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_api_key(&key, &hash));
        assert!(!verify_api_key("ffk_wrong", &hash));
        assert!(!verify_api_key(&key, "not-a-hash"));
    }
}
