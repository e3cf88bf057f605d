//! Rate limit metadata parsed from response headers.
//!
//! The search API reports its quota in response headers. Over time it has
//! used two spellings for the same counters, `x-rate-limit-*` and
//! `x-ratelimit-*`, and header names arrive in whatever case the server or a
//! proxy chose. Both spellings are accepted in any case.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use std::time::{Duration, SystemTime};

const LIMIT_HEADERS: &[&str] = &["x-rate-limit-limit", "x-ratelimit-limit"];
const REMAINING_HEADERS: &[&str] = &["x-rate-limit-remaining", "x-ratelimit-remaining"];
const RESET_HEADERS: &[&str] = &["x-rate-limit-reset", "x-ratelimit-reset", "ratelimit-reset"];
const RETRY_AFTER_HEADER: &str = "retry-after";

/// Quota information extracted from a single response.
///
/// Every field is optional. A field whose header is missing or does not
/// parse is `None`, never zero, so a caller can tell "unknown" apart from
/// "exhausted".
///
/// # Examples
///
/// ```
/// use trendfetch::rate_limit::RateLimitInfo;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-rate-limit-limit", "450".parse().unwrap());
/// headers.insert("x-rate-limit-remaining", "0".parse().unwrap());
/// headers.insert("retry-after", "60".parse().unwrap());
///
/// let info = RateLimitInfo::from_headers(&headers);
/// assert_eq!(info.limit, Some(450));
/// assert!(info.is_rate_limited());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests allowed in the current window.
    pub limit: Option<u64>,

    /// Requests left in the current window.
    pub remaining: Option<u64>,

    /// When the current window resets.
    pub reset_at: Option<DateTime<Utc>>,

    /// How long the server asked us to wait (from `Retry-After`).
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from response headers.
    ///
    /// Header values that are not valid visible ASCII are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        )
    }

    /// Extracts rate limit information from arbitrary name/value pairs.
    ///
    /// Use this when the headers have already been flattened into a map, for
    /// example after crossing a process boundary. Names are matched without
    /// regard to case. When a field appears more than once, the first value
    /// that parses wins.
    ///
    /// ```
    /// use trendfetch::rate_limit::RateLimitInfo;
    ///
    /// let lower = RateLimitInfo::from_pairs([("x-rate-limit-remaining", "12")]);
    /// let upper = RateLimitInfo::from_pairs([("X-Rate-Limit-Remaining", "12")]);
    /// assert_eq!(lower, upper);
    /// assert_eq!(lower.remaining, Some(12));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_pairs_at(pairs, SystemTime::now())
    }

    pub(crate) fn from_pairs_at<I, K, V>(pairs: I, now: SystemTime) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut info = Self::default();

        for (name, value) in pairs {
            let name = name.as_ref().to_ascii_lowercase();
            let value = value.as_ref().trim();

            if info.limit.is_none() && LIMIT_HEADERS.contains(&name.as_str()) {
                info.limit = value.parse().ok();
            } else if info.remaining.is_none() && REMAINING_HEADERS.contains(&name.as_str()) {
                info.remaining = value.parse().ok();
            } else if info.reset_at.is_none() && RESET_HEADERS.contains(&name.as_str()) {
                info.reset_at = parse_reset(value);
            } else if info.retry_after.is_none() && name == RETRY_AFTER_HEADER {
                info.retry_after = parse_retry_after(value, now);
            }
        }

        info
    }

    /// Returns `true` if no quota field was found.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns `true` if this represents an active rate limit.
    ///
    /// A rate limit is considered active if `retry_after` is present or
    /// `remaining` is `Some(0)`.
    pub fn is_rate_limited(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }

    /// Returns the time left until the window resets, measured from `now`.
    ///
    /// A reset time in the past yields zero.
    pub fn reset_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        let reset_at = self.reset_at?;
        Some((reset_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Returns the server-requested wait, capped by `max_wait`.
    ///
    /// A zero `Retry-After` counts as absent.
    pub fn retry_after_delay(&self, max_wait: Duration) -> Option<Duration> {
        self.retry_after
            .filter(|d| !d.is_zero())
            .map(|d| d.min(max_wait))
    }
}

/// Configuration for how the client reacts to rate limiting.
///
/// # Examples
///
/// ```
/// use trendfetch::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .max_wait(Duration::from_secs(60))
///     .build();
/// assert!(config.respect_retry_after);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether a 429 `Retry-After` value replaces exponential backoff.
    ///
    /// Defaults to `true`.
    pub respect_retry_after: bool,

    /// Upper bound for a single `Retry-After` wait.
    ///
    /// Defaults to 5 minutes.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            respect_retry_after: true,
            max_wait: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    /// Creates a new builder for configuring rate limit handling.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// A configuration that ignores `Retry-After` and always backs off
    /// exponentially.
    pub fn ignore_retry_after() -> Self {
        Self {
            respect_retry_after: false,
            ..Default::default()
        }
    }
}

/// Builder for `RateLimitConfig`.
#[derive(Default)]
pub struct RateLimitConfigBuilder {
    respect_retry_after: Option<bool>,
    max_wait: Option<Duration>,
}

impl RateLimitConfigBuilder {
    /// Sets whether to respect the Retry-After header.
    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = Some(respect);
        self
    }

    /// Sets the maximum wait time for a single Retry-After.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Builds the `RateLimitConfig`.
    pub fn build(self) -> RateLimitConfig {
        let default = RateLimitConfig::default();
        RateLimitConfig {
            respect_retry_after: self
                .respect_retry_after
                .unwrap_or(default.respect_retry_after),
            max_wait: self.max_wait.unwrap_or(default.max_wait),
        }
    }
}

/// Parses a Retry-After value.
///
/// Accepts delay-seconds (fractional values too) and HTTP dates. Negative or
/// non-finite seconds and dates already in the past yield `None`.
fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let date_time = httpdate::parse_http_date(value).ok()?;
    date_time.duration_since(now).ok()
}

/// Parses a reset header holding Unix seconds.
fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let timestamp = value.parse::<i64>().ok()?;
    DateTime::from_timestamp(timestamp, 0)
}
