//! Outcome classification, backoff and the seams the retry loop waits through.
//!
//! The retry loop in [`Client`](crate::Client) is driven by three small
//! pieces that live here so they can be tested without a network or a clock:
//!
//! - [`classify`] maps an HTTP status to an [`Outcome`].
//! - [`BackoffPolicy`] turns an attempt number and a jitter sample into a wait.
//! - [`JitterSource`] and [`Sleeper`] are the injectable randomness and timer.

use async_trait::async_trait;
use http::StatusCode;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// What the retry loop should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Parse the body and return it.
    Success,
    /// Wait and try again, if attempts remain.
    Retryable,
    /// Give up immediately.
    Fatal,
}

/// Classifies a response status.
///
/// 2xx is a success, 429 and 5xx are retryable, everything else is fatal.
/// A success without a body yields an empty result rather than an error.
///
/// ```
/// use trendfetch::retry::{classify, Outcome};
/// use http::StatusCode;
///
/// assert_eq!(classify(StatusCode::OK), Outcome::Success);
/// assert_eq!(classify(StatusCode::TOO_MANY_REQUESTS), Outcome::Retryable);
/// assert_eq!(classify(StatusCode::BAD_GATEWAY), Outcome::Retryable);
/// assert_eq!(classify(StatusCode::NOT_FOUND), Outcome::Fatal);
/// ```
pub fn classify(status: StatusCode) -> Outcome {
    if status.is_success() {
        Outcome::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Outcome::Retryable
    } else {
        Outcome::Fatal
    }
}

/// Exponential backoff with additive jitter.
///
/// The wait after failed attempt `n` (1-indexed) is
/// `base * 2^(n-1) + jitter`, where `jitter` is a number of seconds in
/// `[0, 1)`.
///
/// # Examples
///
/// ```
/// use trendfetch::retry::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::new(Duration::from_secs(1), 5);
/// assert_eq!(policy.delay_for_attempt(1, 0.0), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(3, 0.5), Duration::from_millis(4500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait before the first retry, before jitter.
    pub base: Duration,
    /// Total number of attempts, including the first.
    pub max_attempts: usize,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with the given base delay and attempt budget.
    pub fn new(base: Duration, max_attempts: usize) -> Self {
        Self { base, max_attempts }
    }

    /// Returns the wait after the given failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-indexed)
    /// * `jitter_secs` - Extra seconds to add, normally in `[0, 1)`
    pub fn delay_for_attempt(&self, attempt: usize, jitter_secs: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
        let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(multiplier) + jitter_duration(jitter_secs)
    }

    /// Returns `true` if another attempt may follow the given one.
    pub fn has_attempts_after(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

/// Converts a jitter sample to a duration, treating bad samples as zero.
pub(crate) fn jitter_duration(jitter_secs: f64) -> Duration {
    Duration::try_from_secs_f64(jitter_secs).unwrap_or(Duration::ZERO)
}

/// A source of jitter samples, in seconds.
///
/// The default [`UniformJitter`] draws from `[0, 1)`. Tests swap in
/// [`FixedJitter`] to make waits exact.
pub trait JitterSource: Send + Sync {
    /// Returns the next jitter sample in seconds.
    fn sample(&self) -> f64;
}

/// Uniform jitter in `[0, 1)` seconds from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformJitter;

impl JitterSource for UniformJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Always returns the same jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Something the retry loop can wait on.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested wait and returns immediately.
///
/// Useful in tests that assert on backoff windows without spending real time.
///
/// ```
/// use trendfetch::retry::{RecordingSleeper, Sleeper};
/// use std::time::Duration;
///
/// # async fn example() {
/// let sleeper = RecordingSleeper::new();
/// sleeper.sleep(Duration::from_secs(2)).await;
/// assert_eq!(sleeper.waits(), vec![Duration::from_secs(2)]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the waits requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        match self.waits.lock() {
            Ok(waits) => waits.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.waits.lock() {
            Ok(mut waits) => waits.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}
