//! Error types for search fetches.
//!
//! Errors are split in two layers. [`TransportError`] describes a single failed
//! attempt that the retry loop is allowed to try again. [`Error`] is what a
//! caller actually sees: input and configuration problems raised before any
//! I/O, fatal API responses, and the terminal errors of the retry loop that
//! wrap the last transport failure.

use crate::rate_limit::RateLimitInfo;
use http::StatusCode;
use std::time::Duration;

/// Longest body excerpt kept on an error, in characters.
pub(crate) const BODY_EXCERPT_LIMIT: usize = 512;

/// The error type returned by [`Client::fetch`](crate::Client::fetch).
///
/// # Examples
///
/// ```no_run
/// use trendfetch::{Client, Credential, Error, FetchMode, QuerySpec};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().build()?;
/// let spec = QuerySpec::new("#rust", 25)?;
/// let credential = Credential::new("token");
///
/// match client.fetch(&spec, Some(&credential), FetchMode::Live).await {
///     Ok(fetched) => println!("{} records", fetched.result.len()),
///     Err(Error::FatalApi { status, body_excerpt, .. }) => {
///         eprintln!("API refused the request ({}): {}", status, body_excerpt);
///     }
///     Err(Error::ExhaustedRetries { attempts, last_error }) => {
///         eprintln!("gave up after {} attempts: {}", attempts, last_error);
///     }
///     Err(e) => eprintln!("{}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The query was rejected before any request was made.
    ///
    /// Raised for empty or whitespace-only query text and for non-positive
    /// result counts. Never retried.
    #[error("Invalid query: {0}")]
    Validation(String),

    /// The client or the call was misconfigured.
    ///
    /// Covers a missing credential in [`FetchMode::Live`](crate::FetchMode::Live),
    /// invalid header names or values, inconsistent count bounds, and failures
    /// building the underlying HTTP client.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API answered with a status that will not get better on retry.
    ///
    /// Any 4xx other than 429 lands here, as does any other status that is
    /// neither a success nor retryable.
    #[error("API returned error {status}: {body_excerpt}")]
    FatalApi {
        /// The HTTP status code
        status: StatusCode,
        /// The start of the response body
        body_excerpt: String,
        /// Quota headers observed on the failing response
        rate_limit_info: RateLimitInfo,
    },

    /// The API answered successfully but the body was not the expected shape.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// Every attempt failed with a retryable error.
    #[error("Failed to fetch after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// The number of attempts made
        attempts: usize,
        /// The last failure observed
        last_error: Box<TransportError>,
    },

    /// The caller's overall deadline ran out before the fetch could succeed.
    #[error("Deadline exceeded after {attempts} attempts ({elapsed:?})")]
    DeadlineExceeded {
        /// The number of attempts made
        attempts: usize,
        /// Time spent inside the call
        elapsed: Duration,
        /// The last failure observed, if any attempt completed
        last_error: Option<Box<TransportError>>,
    },
}

impl Error {
    /// Returns the HTTP status code most relevant to this error, if any.
    ///
    /// For the retry-loop errors this is the status of the last failed attempt.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::FatalApi { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::ExhaustedRetries { last_error, .. } => last_error.status(),
            Error::DeadlineExceeded { last_error, .. } => {
                last_error.as_ref().and_then(|e| e.status())
            }
            _ => None,
        }
    }

    /// Returns the number of attempts the retry loop made before giving up.
    ///
    /// `None` for errors that did not come out of the retry loop.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Error::ExhaustedRetries { attempts, .. } => Some(*attempts),
            Error::DeadlineExceeded { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns quota information observed on the last response, if any.
    pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
        match self {
            Error::FatalApi {
                rate_limit_info, ..
            } => Some(rate_limit_info),
            Error::ExhaustedRetries { last_error, .. } => last_error.rate_limit_info(),
            Error::DeadlineExceeded { last_error, .. } => {
                last_error.as_ref().and_then(|e| e.rate_limit_info())
            }
            _ => None,
        }
    }

    /// Returns `true` if the caller has to change its input or setup to
    /// make progress, as opposed to trying again later.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Configuration(_) | Error::InvalidUrl(_)
        )
    }
}

/// A failed attempt that the retry loop may try again.
///
/// These never reach the caller on their own; they show up as the
/// `last_error` of [`Error::ExhaustedRetries`] or [`Error::DeadlineExceeded`].
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Connection, DNS or protocol failure below HTTP.
    #[error("Network error: {0}")]
    Connection(#[source] reqwest::Error),

    /// The attempt did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered 429 Too Many Requests.
    ///
    /// Any server-supplied wait is in `rate_limit_info.retry_after`.
    #[error("429 rate limit: {body_excerpt}")]
    RateLimited {
        /// The start of the response body
        body_excerpt: String,
        /// Quota headers observed on the response
        rate_limit_info: RateLimitInfo,
    },

    /// The server answered with a 5xx status.
    #[error("{status} server error: {body_excerpt}")]
    Server {
        /// The HTTP status code
        status: StatusCode,
        /// The start of the response body
        body_excerpt: String,
        /// Quota headers observed on the response
        rate_limit_info: RateLimitInfo,
    },
}

impl TransportError {
    /// Returns the HTTP status code if the attempt got a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            TransportError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns quota information observed on the response, if any.
    pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
        match self {
            TransportError::RateLimited {
                rate_limit_info, ..
            }
            | TransportError::Server {
                rate_limit_info, ..
            } => Some(rate_limit_info),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(err)
        }
    }
}

/// Cuts a response body down to [`BODY_EXCERPT_LIMIT`] characters.
pub(crate) fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// A specialized `Result` type for fetches.
pub type Result<T> = std::result::Result<T, Error>;
