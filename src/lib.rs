//! # trendfetch - a resilient recent-search client
//!
//! trendfetch fetches recent posts matching a query from a social platform's
//! search API and hands them back as table-ready records together with the
//! quota information the API reported. It is built on `reqwest` and is meant
//! to sit under a dashboard that must keep working when the API is slow,
//! rate limited, or not configured at all.
//!
//! ## Quick Start
//!
//! ```no_run
//! use trendfetch::{Client, Credential, FetchMode, QuerySpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trendfetch::Error> {
//!     let client = Client::builder().build()?;
//!
//!     let spec = QuerySpec::new("#ai", 25)?;
//!     let credential = std::env::var("X_API_KEY").ok().map(Credential::new);
//!
//!     // Live when a credential is present, synthetic data otherwise
//!     let fetched = client
//!         .fetch(&spec, credential.as_ref(), FetchMode::LiveOrDemo)
//!         .await?;
//!
//!     for record in &fetched.result {
//!         println!("{} {}", record.id, record.text);
//!     }
//!     println!("remaining quota: {:?}", fetched.rate_limit.remaining);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded retries** - up to 5 attempts, exponential backoff with jitter
//! - **Rate-limit aware** - 429 responses wait out `Retry-After` when the server sends one
//! - **Fail fast** - bad input and non-429 4xx responses are never retried
//! - **Quota introspection** - [`RateLimitInfo`] accompanies every result and most errors
//! - **Demo fallback** - synthetic records when there is no credential or live calls are unwanted
//! - **Deadlines** - per-attempt timeout plus an optional overall deadline
//! - **Testable timing** - sleeping and jitter are injectable, see [`retry`]
//!
//! ## Error Handling
//!
//! ```no_run
//! use trendfetch::{Client, Credential, Error, FetchMode, QuerySpec};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().build()?;
//! # let spec = QuerySpec::new("#ai", 25)?;
//! # let credential = Credential::new("token");
//! match client.fetch(&spec, Some(&credential), FetchMode::Live).await {
//!     Ok(fetched) => println!("{} records", fetched.result.len()),
//!     Err(e) if e.is_caller_error() => eprintln!("fix your setup: {}", e),
//!     Err(Error::FatalApi { status, body_excerpt, .. }) => {
//!         eprintln!("API error {}: {}", status, body_excerpt);
//!     }
//!     Err(e) => {
//!         eprintln!("temporarily unavailable: {}", e);
//!         if let Some(info) = e.rate_limit_info() {
//!             eprintln!("  quota resets at {:?}", info.reset_at);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod credential;
pub mod demo;
mod error;
mod model;
mod query;
pub mod rate_limit;
mod response;
pub mod retry;

pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_SEARCH_PATH};
pub use credential::Credential;
pub use error::{Error, Result, TransportError};
pub use model::{FetchResult, Record, SearchMeta};
pub use query::{CountBounds, FetchMode, QuerySpec};
pub use rate_limit::RateLimitInfo;
pub use response::{FetchSource, Fetched};
pub use retry::{BackoffPolicy, Outcome};
