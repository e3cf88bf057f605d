//! Search client with retry logic and a demo-data fallback.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure and create clients.

use crate::{
    demo,
    error::excerpt,
    model::{normalize, FetchResult, SearchResponse},
    query::{CountBounds, FetchMode, QuerySpec},
    rate_limit::{RateLimitConfig, RateLimitInfo},
    retry::{
        classify, jitter_duration, BackoffPolicy, JitterSource, Outcome, Sleeper, TokioSleeper,
        UniformJitter,
    },
    Credential, Error, Fetched, Result, TransportError,
};
use chrono::Utc;
use http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
/// Default recent-search path.
pub const DEFAULT_SEARCH_PATH: &str = "/2/tweets/search/recent";

/// A recent-search client with retry logic, rate-limit introspection and a
/// demo fallback.
///
/// The client is cheap to clone and meant to be reused. Each call to
/// [`fetch`](Client::fetch) keeps its own attempt counter and backoff timer,
/// so concurrent calls do not coordinate with each other.
///
/// # Examples
///
/// ```no_run
/// use trendfetch::{Client, Credential, FetchMode, QuerySpec};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), trendfetch::Error> {
/// let client = Client::builder()
///     .timeout(Duration::from_secs(15))
///     .max_attempts(5)
///     .deadline(Duration::from_secs(60))
///     .build()?;
///
/// let spec = QuerySpec::new("#rustlang", 25)?;
/// let credential = Credential::new(std::env::var("X_API_KEY").unwrap_or_default());
///
/// let fetched = client.fetch(&spec, Some(&credential), FetchMode::Live).await?;
/// for record in &fetched.result {
///     println!("{:?}: {}", record.author_username, record.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    search_url: Url,
    default_headers: HeaderMap,
    backoff: BackoffPolicy,
    timeout: Duration,
    deadline: Option<Duration>,
    live_bounds: CountBounds,
    demo_bounds: CountBounds,
    rate_limit_config: RateLimitConfig,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

/// Result of one attempt that did not fail fatally.
enum Attempt {
    Done(Fetched),
    Retry(TransportError),
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Fetches records for `spec`.
    ///
    /// `mode` and `credential` together decide whether the network is used:
    ///
    /// | mode | credential | behaviour |
    /// |------|------------|-----------|
    /// | `Demo` | any | synthetic records, no I/O |
    /// | `LiveOrDemo` | `None` | synthetic records, no I/O |
    /// | `Live` | `None` | [`Error::Configuration`] |
    /// | `Live` / `LiveOrDemo` | `Some` | live search with retries |
    ///
    /// A blank credential counts as `None`.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] when live data is required but no
    ///   credential was given.
    /// - [`Error::FatalApi`] for a non-retryable response, after one attempt.
    /// - [`Error::DeserializationFailed`] for a malformed success body.
    /// - [`Error::ExhaustedRetries`] when every attempt failed with a
    ///   retryable error.
    /// - [`Error::DeadlineExceeded`] when the configured overall deadline ran
    ///   out first.
    pub async fn fetch(
        &self,
        spec: &QuerySpec,
        credential: Option<&Credential>,
        mode: FetchMode,
    ) -> Result<Fetched> {
        let credential = credential.filter(|c| !c.is_blank());

        match (mode, credential) {
            (FetchMode::Demo, _) | (FetchMode::LiveOrDemo, None) => Ok(self.demo(spec)),
            (FetchMode::Live, None) => Err(Error::Configuration(
                "no API credential available; supply one or use demo mode".to_string(),
            )),
            (_, Some(credential)) => self.fetch_live(spec, credential).await,
        }
    }

    /// Validates raw inputs and fetches.
    ///
    /// `live_mode = true` requires a live call; `false` returns demo data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank text or a non-positive count,
    /// before any I/O. Otherwise as [`fetch`](Client::fetch).
    pub async fn fetch_query(
        &self,
        query_text: &str,
        desired_count: i64,
        credential: Option<&Credential>,
        live_mode: bool,
    ) -> Result<Fetched> {
        let spec = QuerySpec::new(query_text, desired_count)?;
        self.fetch(&spec, credential, FetchMode::from_live_flag(live_mode)).await
    }

    /// Builds demo results for `spec`, clamped to the demo bounds.
    pub fn demo(&self, spec: &QuerySpec) -> Fetched {
        let count = spec.clamped_count(self.inner.demo_bounds);
        tracing::info!(query = %spec.text(), count = count, "Serving demo results");
        Fetched::demo(demo::generate(spec.text(), count, Utc::now()))
    }

    async fn fetch_live(&self, spec: &QuerySpec, credential: &Credential) -> Result<Fetched> {
        let start_time = Instant::now();
        let url = self.search_url(spec);
        let authorization = HeaderValue::try_from(credential.authorization()).map_err(|_| {
            Error::Configuration("credential contains invalid header characters".to_string())
        })?;

        let mut attempt = 0;
        let mut last_error: Option<TransportError> = None;

        loop {
            let timeout = match self.remaining(start_time) {
                Some(remaining) if remaining.is_zero() => {
                    return Err(Error::DeadlineExceeded {
                        attempts: attempt,
                        elapsed: start_time.elapsed(),
                        last_error: last_error.map(Box::new),
                    });
                }
                Some(remaining) => remaining.min(self.inner.timeout),
                None => self.inner.timeout,
            };

            attempt += 1;

            let error = match self
                .execute_request(&url, &authorization, timeout, attempt)
                .await
            {
                Ok(response) => match self.parse_response(response, start_time, attempt).await? {
                    Attempt::Done(fetched) => return Ok(fetched),
                    Attempt::Retry(e) => e,
                },
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                max_attempts = self.inner.backoff.max_attempts,
                "Search attempt failed"
            );

            if !self.inner.backoff.has_attempts_after(attempt) {
                return Err(Error::ExhaustedRetries {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = self.delay_after(&error, attempt);

            if let Some(deadline) = self.inner.deadline {
                if start_time.elapsed() + delay >= deadline {
                    tracing::warn!(
                        delay_ms = delay.as_millis() as u64,
                        deadline_ms = deadline.as_millis() as u64,
                        attempt = attempt,
                        "Next retry would pass the deadline"
                    );
                    return Err(Error::DeadlineExceeded {
                        attempts: attempt,
                        elapsed: start_time.elapsed(),
                        last_error: Some(Box::new(error)),
                    });
                }
            }

            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt = attempt,
                "Retrying search after delay"
            );

            self.inner.sleeper.sleep(delay).await;
            last_error = Some(error);
        }
    }

    /// Time left before the overall deadline, if one is set.
    fn remaining(&self, start_time: Instant) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_sub(start_time.elapsed()))
    }

    /// Picks the wait before the next attempt.
    ///
    /// A positive `Retry-After` on a 429 wins over exponential backoff unless
    /// the rate limit config says otherwise. Jitter is added either way.
    fn delay_after(&self, error: &TransportError, attempt: usize) -> Duration {
        let jitter = self.inner.jitter.sample();
        let config = &self.inner.rate_limit_config;

        if let TransportError::RateLimited {
            rate_limit_info, ..
        } = error
        {
            if config.respect_retry_after {
                if let Some(wait) = rate_limit_info.retry_after_delay(config.max_wait) {
                    tracing::info!(
                        retry_after_ms = wait.as_millis() as u64,
                        attempt = attempt,
                        "Rate limited - honoring Retry-After"
                    );
                    return wait + jitter_duration(jitter);
                }
            }
        }

        self.inner.backoff.delay_for_attempt(attempt, jitter)
    }

    fn search_url(&self, spec: &QuerySpec) -> Url {
        let mut url = self.inner.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in spec.search_params(self.inner.live_bounds) {
                pairs.append_pair(key, &value);
            }
        }
        url
    }

    /// Executes a single request attempt.
    async fn execute_request(
        &self,
        url: &Url,
        authorization: &HeaderValue,
        timeout: Duration,
        attempt: usize,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        tracing::debug!(
            url = %url,
            attempt = attempt,
            timeout_ms = timeout.as_millis() as u64,
            "Executing search request"
        );

        let mut request = self.inner.http_client.get(url.clone()).timeout(timeout);

        for (name, value) in &self.inner.default_headers {
            request = request.header(name, value);
        }
        request = request.header(AUTHORIZATION, authorization.clone());

        Ok(request.send().await?)
    }

    /// Classifies a response and, on success, parses and normalizes it.
    async fn parse_response(
        &self,
        response: reqwest::Response,
        start_time: Instant,
        attempt: usize,
    ) -> Result<Attempt> {
        let status = response.status();
        let rate_limit_info = RateLimitInfo::from_headers(response.headers());

        tracing::info!(
            status = status.as_u16(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            attempt = attempt,
            remaining = ?rate_limit_info.remaining,
            "Received search response"
        );

        match classify(status) {
            Outcome::Success => {
                let raw_body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => return Ok(Attempt::Retry(e.into())),
                };

                // 204 and friends carry no body
                if raw_body.trim().is_empty() {
                    tracing::debug!(status = status.as_u16(), "Success response without a body");
                    return Ok(Attempt::Done(Fetched::live(
                        FetchResult::default(),
                        rate_limit_info,
                        attempt,
                        start_time.elapsed(),
                    )));
                }

                match serde_json::from_str::<SearchResponse>(&raw_body) {
                    Ok(body) => {
                        let result = normalize(body);
                        tracing::debug!(records = result.len(), "Normalized search results");
                        Ok(Attempt::Done(Fetched::live(
                            result,
                            rate_limit_info,
                            attempt,
                            start_time.elapsed(),
                        )))
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            raw_response = %excerpt(&raw_body),
                            "Failed to deserialize search response"
                        );
                        Err(Error::DeserializationFailed {
                            status,
                            raw_response: raw_body,
                            serde_error: e.to_string(),
                        })
                    }
                }
            }
            Outcome::Retryable => {
                let body_excerpt = excerpt(&response.text().await.unwrap_or_default());
                if status == StatusCode::TOO_MANY_REQUESTS {
                    Ok(Attempt::Retry(TransportError::RateLimited {
                        body_excerpt,
                        rate_limit_info,
                    }))
                } else {
                    Ok(Attempt::Retry(TransportError::Server {
                        status,
                        body_excerpt,
                        rate_limit_info,
                    }))
                }
            }
            Outcome::Fatal => {
                let body_excerpt = excerpt(&response.text().await.unwrap_or_default());
                tracing::error!(
                    status = status.as_u16(),
                    response = %body_excerpt,
                    "Search request rejected"
                );
                Err(Error::FatalApi {
                    status,
                    body_excerpt,
                    rate_limit_info,
                })
            }
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Every setting has a default matching the public recent-search API:
/// 15 second attempt timeout, 5 attempts, 1 second backoff base, no overall
/// deadline, live counts in `[10, 100]` and demo counts in `[5, 20]`.
///
/// # Examples
///
/// ```no_run
/// use trendfetch::{ClientBuilder, CountBounds};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), trendfetch::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(10))
///     .backoff_base(Duration::from_millis(500))
///     .demo_bounds(CountBounds::new(1, 50)?)
///     .default_header("User-Agent", "trend-dashboard/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    search_path: String,
    default_headers: HeaderMap,
    backoff: BackoffPolicy,
    timeout: Duration,
    deadline: Option<Duration>,
    live_bounds: CountBounds,
    demo_bounds: CountBounds,
    rate_limit_config: RateLimitConfig,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            default_headers: HeaderMap::new(),
            backoff: BackoffPolicy::default(),
            timeout: Duration::from_secs(15),
            deadline: None,
            live_bounds: CountBounds::LIVE,
            demo_bounds: CountBounds::DEMO,
            rate_limit_config: RateLimitConfig::default(),
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(UniformJitter),
        }
    }

    /// Sets the API host. Defaults to [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the search endpoint path. Defaults to [`DEFAULT_SEARCH_PATH`].
    pub fn search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    /// Adds a header sent on every attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        if name == AUTHORIZATION {
            return Err(Error::Configuration(
                "Authorization comes from the credential, not a default header".to_string(),
            ));
        }
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the timeout for a single attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the overall deadline for one fetch, waits included.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the total number of attempts, including the first.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.backoff.max_attempts = max_attempts;
        self
    }

    /// Sets the wait before the first retry; later waits double.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff.base = base;
        self
    }

    /// Replaces the whole backoff policy.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the range live result counts are clamped into.
    pub fn live_bounds(mut self, bounds: CountBounds) -> Self {
        self.live_bounds = bounds;
        self
    }

    /// Sets the range demo result counts are clamped into.
    pub fn demo_bounds(mut self, bounds: CountBounds) -> Self {
        self.demo_bounds = bounds;
        self
    }

    /// Sets how 429 responses are waited out.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Replaces the timer used between attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the jitter source used for backoff.
    pub fn jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error for an attempt budget of zero, invalid count bounds,
    /// an unusable URL, or if the HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        if self.backoff.max_attempts == 0 {
            return Err(Error::Configuration("max_attempts must be at least 1".to_string()));
        }
        let live_bounds = CountBounds::new(self.live_bounds.min, self.live_bounds.max)?;
        let demo_bounds = CountBounds::new(self.demo_bounds.min, self.demo_bounds.max)?;

        let mut search_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        if search_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Base URL cannot carry a path: {}",
                search_url
            )));
        }
        search_url.set_path(&self.search_path);

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                search_url,
                default_headers: self.default_headers,
                backoff: self.backoff,
                timeout: self.timeout,
                deadline: self.deadline,
                live_bounds,
                demo_bounds,
                rate_limit_config: self.rate_limit_config,
                sleeper: self.sleeper,
                jitter: self.jitter,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
