//! Shared HTTP plumbing for live provider calls
//!
//! Each live source owns one `HttpProvider`: the shared `reqwest` client, the
//! source's base URL and credentials, and a `governor` rate limiter sized from
//! `rate_limit_per_second`.

use crate::types::ProviderError;
use ecoscan_common::config::SourceConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("EcoScan/", env!("CARGO_PKG_VERSION"));

/// Build the process-wide HTTP client
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()
}

/// Rate-limited JSON client for one provider
pub struct HttpProvider {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    /// An `api_key_env` is configured, so calls without a key are pointless
    requires_key: bool,
    timeout: Duration,
    rate_limiter: DefaultDirectRateLimiter,
}

impl HttpProvider {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        let per_second = NonZeroU32::new(config.rate_limit_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            endpoint: config
                .endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            api_key: config.api_key(),
            requires_key: config.api_key_env.is_some(),
            timeout: Duration::from_millis(config.timeout_ms),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }

    /// Base URL, or `Unavailable` when the provider cannot be called at all
    fn base(&self) -> Result<&str, ProviderError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("no endpoint configured".to_string()))?;
        if self.requires_key && self.api_key.is_none() {
            return Err(ProviderError::Unavailable("missing credentials".to_string()));
        }
        Ok(endpoint)
    }

    /// Whether a live call could be attempted
    pub fn is_configured(&self) -> bool {
        self.base().is_ok()
    }

    /// GET `{endpoint}{path}?{params}` and decode JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base()?, path);
        self.send(self.client.get(&url).query(params)).await
    }

    /// POST JSON `body` to `{endpoint}{path}` and decode JSON
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base()?, path);
        self.send(self.client.post(&url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        self.rate_limiter.until_ready().await;

        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout.as_millis() as u64)
            } else {
                ProviderError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Provider returned error status");
            return Err(ProviderError::Http(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(endpoint: Option<&str>, api_key_env: Option<&str>) -> HttpProvider {
        let mut config = SourceConfig::new("test", 5);
        config.endpoint = endpoint.map(str::to_string);
        config.api_key_env = api_key_env.map(str::to_string);
        HttpProvider::new(Client::new(), &config)
    }

    #[test]
    fn test_unconfigured_provider_is_unavailable() {
        let p = provider(None, None);
        assert!(!p.is_configured());
        assert!(matches!(p.base(), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_missing_credentials_is_unavailable() {
        let p = provider(Some("https://example.test/"), Some("ECOSCAN_UNSET_TEST_KEY_0"));
        assert_eq!(
            p.base(),
            Err(ProviderError::Unavailable("missing credentials".to_string()))
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let p = provider(Some("https://example.test/"), None);
        assert_eq!(p.base(), Ok("https://example.test"));
    }

    #[tokio::test]
    async fn test_get_without_endpoint_fails_fast() {
        let p = provider(None, None);
        let result: Result<serde_json::Value, _> = p.get_json("/anything", &[]).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }
}
