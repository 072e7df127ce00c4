use std::time::Duration;

use super::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(15_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`FlagsClient`](super::FlagsClient).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_key: String,
    pub project_key: String,
    pub environment_key: String,
    pub base_url: String,
    /// Time between background refreshes. `Duration::ZERO` disables polling; the initial
    /// fetch still happens.
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientOptions {
    pub fn new(
        api_key: impl Into<String>,
        project_key: impl Into<String>,
        environment_key: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            project_key: project_key.into(),
            environment_key: environment_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checked before any network call is made.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::MissingOption("apiKey"));
        }
        if self.project_key.trim().is_empty() {
            return Err(ClientError::MissingOption("projectKey"));
        }
        if self.environment_key.trim().is_empty() {
            return Err(ClientError::MissingOption("environmentKey"));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, falling back to the default when blank.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new("key", "shop", "production");
        assert_eq!(options.base_url, "http://localhost:3000");
        assert_eq!(options.refresh_interval, Duration::from_millis(15_000));
    }

    #[test]
    fn test_missing_options_are_named() {
        let err = ClientOptions::new("", "shop", "production").validate().unwrap_err();
        assert_eq!(err.to_string(), "apiKey is required");

        let err = ClientOptions::new("key", "", "production").validate().unwrap_err();
        assert_eq!(err.to_string(), "projectKey is required");

        let err = ClientOptions::new("key", "shop", " ").validate().unwrap_err();
        assert_eq!(err.to_string(), "environmentKey is required");
    }

    #[test]
    fn test_base_url_normalization() {
        let options = ClientOptions::new("k", "p", "e").base_url("https://flags.example.com/");
        assert_eq!(options.normalized_base_url(), "https://flags.example.com");

        let options = ClientOptions::new("k", "p", "e").base_url("");
        assert_eq!(options.normalized_base_url(), DEFAULT_BASE_URL);
    }
}
