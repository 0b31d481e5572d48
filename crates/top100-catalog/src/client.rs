// SPDX-License-Identifier: GPL-3.0-or-later

use crate::auth::{StaticToken, TokenProvider};
use crate::error::{CatalogError, RequestFailure, Result};
use crate::models::{SearchResponse, Track};
use crate::rate_limiter::RateLimiter;
use crate::search::CatalogSearch;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use top100_domain::CatalogCandidate;
use tracing::{debug, error, trace, warn};
use url::Url;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("top100/", env!("CARGO_PKG_VERSION"));

/// Catalog search client with rate limiting and retries.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    token_provider: Arc<dyn TokenProvider>,
}

impl CatalogClient {
    /// Create a client builder for custom configuration.
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Search for tracks carrying the given ISRC.
    ///
    /// # Example
    /// ```no_run
    /// # use top100_catalog::CatalogClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = CatalogClient::builder().access_token("token").build()?;
    /// let tracks = client.search_by_isrc("GBAYE0601498").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search_by_isrc(&self, isrc: &str) -> Result<Vec<CatalogCandidate>> {
        let query = format!("isrc:{isrc}");
        debug!(target: "catalog", %query, "search by ISRC");
        self.search(&query, 1).await
    }

    /// Search for tracks by artist and title, returning at most `limit` rows.
    pub async fn search_tracks(
        &self,
        artist: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<CatalogCandidate>> {
        let query = format!("track:{title} artist:{artist}");
        debug!(target: "catalog", %query, limit, "search by artist/title");
        self.search(&query, limit).await
    }

    /// Fetch a single track by catalog ID.
    pub async fn get_track(&self, track_id: &str) -> Result<CatalogCandidate> {
        debug!(target: "catalog", track_id, "fetching track");
        let url = self.endpoint(&format!("tracks/{track_id}"))?;
        let track: Track = self.request(&url).await?;
        Ok(track.into())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogCandidate>> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "track")
            .append_pair("limit", &limit.to_string());

        let response: SearchResponse = self.request(&url).await?;
        Ok(response
            .into_tracks()
            .into_iter()
            .map(CatalogCandidate::from)
            .collect())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| CatalogError::InvalidConfiguration(format!("invalid URL: {e}")))
    }

    /// Issue one logical request, retrying transient failures.
    ///
    /// Every attempt is throttled first. Non-retryable failures surface
    /// immediately; retryable ones sleep for the limiter's backoff until the
    /// attempt budget is spent.
    async fn request<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let max_attempts = self.rate_limiter.max_retries().max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.throttle().await;
            let token = self.token_provider.access_token().await?;

            let failure = match self.send_once(url, &token).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                warn!(target: "catalog", attempt, error = %failure, "catalog request failed, not retrying");
                return Err(CatalogError::RequestFailed {
                    attempts: attempt,
                    cause: failure,
                });
            }

            if attempt >= max_attempts {
                error!(target: "catalog", attempt, error = %failure, "catalog max retries exceeded");
                return Err(CatalogError::RequestFailed {
                    attempts: attempt,
                    cause: failure,
                });
            }

            let delay_ms = self.rate_limiter.retry_delay(attempt)?;
            warn!(
                target: "catalog",
                attempt,
                delay_ms,
                error = %failure,
                "catalog request failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
    ) -> std::result::Result<T, RequestFailure> {
        trace!(target: "catalog", "GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        debug!(target: "catalog", "response status: {}", status);

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RequestFailure::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "catalog", "response body: {}", body);

        serde_json::from_str(&body).map_err(|e| {
            RequestFailure::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl CatalogSearch for CatalogClient {
    async fn search_by_exact_id(&self, isrc: &str) -> Result<Vec<CatalogCandidate>> {
        self.search_by_isrc(isrc).await
    }

    async fn search_by_artist_title(
        &self,
        artist: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<CatalogCandidate>> {
        self.search_tracks(artist, title, limit).await
    }
}

/// Builder for configuring a catalog client.
#[derive(Debug)]
pub struct CatalogClientBuilder {
    base_url: String,
    timeout: Duration,
    requests_per_second: u32,
    max_retries: u32,
    base_delay_ms: u64,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            base_url: SPOTIFY_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            requests_per_second: 10,
            max_retries: 5,
            base_delay_ms: 500,
            token_provider: None,
        }
    }
}

impl CatalogClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Shorthand for a [`StaticToken`] provider.
    pub fn access_token(self, token: impl Into<String>) -> Self {
        self.token_provider(StaticToken::new(token))
    }

    /// Build the catalog client.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The base URL is not a valid URL
    /// - No token provider was configured
    /// - The HTTP client cannot be created
    pub fn build(self) -> Result<CatalogClient> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| CatalogError::InvalidConfiguration(format!("Invalid base URL: {}", e)))?;

        let token_provider = self.token_provider.ok_or_else(|| {
            CatalogError::InvalidConfiguration("no access token configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::InvalidConfiguration(e.to_string()))?;

        Ok(CatalogClient {
            client,
            base_url,
            rate_limiter: RateLimiter::new(
                self.requests_per_second,
                self.max_retries,
                self.base_delay_ms,
            ),
            token_provider,
        })
    }
}
