//! The value a successful fetch returns.
//!
//! [`Fetched`] pairs the records with the quota information observed on the
//! same response, plus timing and retry details, so a dashboard can show
//! quota state whichever path produced the data.

use crate::model::FetchResult;
use crate::rate_limit::RateLimitInfo;
use std::time::Duration;

/// Where the records in a [`Fetched`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// The search API.
    Live,
    /// The synthetic generator; no request was made.
    Demo,
}

/// A successful fetch.
///
/// # Examples
///
/// ```no_run
/// use trendfetch::{Client, FetchMode, QuerySpec};
///
/// # async fn example() -> Result<(), trendfetch::Error> {
/// let client = Client::builder().build()?;
/// let spec = QuerySpec::new("#ai", 10)?;
///
/// let fetched = client.fetch(&spec, None, FetchMode::LiveOrDemo).await?;
/// println!("{} records from {:?}", fetched.result.len(), fetched.source);
/// if let Some(remaining) = fetched.rate_limit.remaining {
///     println!("{} requests left", remaining);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fetched {
    /// The records, in response order.
    pub result: FetchResult,

    /// Quota information from the successful response.
    ///
    /// All-empty for demo results.
    pub rate_limit: RateLimitInfo,

    /// Whether the records are live or synthetic.
    pub source: FetchSource,

    /// Number of network attempts. Zero for demo results.
    pub attempts: usize,

    /// Time spent in the call, including waits between attempts.
    pub latency: Duration,
}

impl Fetched {
    pub(crate) fn live(
        result: FetchResult,
        rate_limit: RateLimitInfo,
        attempts: usize,
        latency: Duration,
    ) -> Self {
        Self {
            result,
            rate_limit,
            source: FetchSource::Live,
            attempts,
            latency,
        }
    }

    pub(crate) fn demo(result: FetchResult) -> Self {
        Self {
            result,
            rate_limit: RateLimitInfo::default(),
            source: FetchSource::Demo,
            attempts: 0,
            latency: Duration::ZERO,
        }
    }

    /// Returns `true` if the request needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns `true` if the records are synthetic.
    pub fn is_demo(&self) -> bool {
        self.source == FetchSource::Demo
    }

    /// Splits into the records and the quota information.
    pub fn into_parts(self) -> (FetchResult, RateLimitInfo) {
        (self.result, self.rate_limit)
    }
}

impl AsRef<FetchResult> for Fetched {
    fn as_ref(&self) -> &FetchResult {
        &self.result
    }
}

impl std::ops::Deref for Fetched {
    type Target = FetchResult;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}
