use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::error::{ClientError, FetchError};
use super::options::ClientOptions;
use crate::models::{ConfigListResponse, FlagConfig};

/// Source of the full config list for one project and environment.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch_configs(&self) -> Result<Vec<FlagConfig>, FetchError>;
}

/// Fetches configs from `GET {base_url}/api/v1/configs`.
#[derive(Debug, Clone)]
pub struct HttpConfigFetcher {
    http_client: Client,
    url: String,
    api_key: String,
    project_key: String,
    environment_key: String,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

impl HttpConfigFetcher {
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(ClientError::HttpClient)?;

        Ok(Self {
            http_client,
            url: format!("{}/api/v1/configs", options.normalized_base_url()),
            api_key: options.api_key.clone(),
            project_key: options.project_key.clone(),
            environment_key: options.environment_key.clone(),
        })
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch_configs(&self) -> Result<Vec<FlagConfig>, FetchError> {
        let response = self
            .http_client
            .get(&self.url)
            .header("X-API-Key", &self.api_key)
            .query(&[
                ("projectKey", self.project_key.as_str()),
                ("environmentKey", self.environment_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let fallback_message = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            return Err(match response.json::<ErrorResponse>().await {
                Ok(body) => FetchError::Http {
                    status: status.as_u16(),
                    code: body.code.unwrap_or_else(|| "HTTP_ERROR".to_string()),
                    message: body.error,
                },
                Err(_) => FetchError::Http {
                    status: status.as_u16(),
                    code: "HTTP_ERROR".to_string(),
                    message: fallback_message,
                },
            });
        }

        let body: ConfigListResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        Ok(body.flags)
    }
}
