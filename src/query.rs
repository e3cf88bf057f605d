//! Query specification and how it becomes request parameters.

use crate::{Error, Result};

/// Tweet fields requested on every live search.
pub(crate) const TWEET_FIELDS: &str = "created_at,public_metrics,author_id";
/// Expansions requested on every live search.
pub(crate) const EXPANSIONS: &str = "author_id";
/// User fields requested for expanded authors.
pub(crate) const USER_FIELDS: &str = "username,name,verified";

/// What to search for and how many results to ask for.
///
/// A `QuerySpec` is validated on construction: the text must contain
/// something other than whitespace and the count must be positive. The count
/// is kept as given; it is clamped into a provider's range only when the
/// request is built, see [`QuerySpec::clamped_count`].
///
/// # Examples
///
/// ```
/// use trendfetch::{CountBounds, QuerySpec};
///
/// let spec = QuerySpec::new("#ai", 500).unwrap();
/// assert_eq!(spec.clamped_count(CountBounds::LIVE), 100);
///
/// assert!(QuerySpec::new("   ", 10).is_err());
/// assert!(QuerySpec::new("#ai", 0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    text: String,
    desired_count: i64,
}

impl QuerySpec {
    /// Creates a validated query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `text` is empty or whitespace-only, or
    /// if `desired_count` is zero or negative.
    pub fn new(text: impl Into<String>, desired_count: i64) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }
        if desired_count <= 0 {
            return Err(Error::Validation(format!(
                "result count must be positive, got {}",
                desired_count
            )));
        }
        Ok(Self {
            text,
            desired_count,
        })
    }

    /// The query text as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The count as requested, before clamping.
    pub fn desired_count(&self) -> i64 {
        self.desired_count
    }

    /// The count to actually request, clamped into `bounds`.
    pub fn clamped_count(&self, bounds: CountBounds) -> u32 {
        bounds.clamp(self.desired_count)
    }

    /// Query parameters for a live recent-search request.
    pub(crate) fn search_params(&self, bounds: CountBounds) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.text.clone()),
            ("max_results", self.clamped_count(bounds).to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", EXPANSIONS.to_string()),
            ("user.fields", USER_FIELDS.to_string()),
        ]
    }
}

/// An inclusive range of accepted result counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountBounds {
    /// Smallest accepted count.
    pub min: u32,
    /// Largest accepted count.
    pub max: u32,
}

impl CountBounds {
    /// The recent-search endpoint's `max_results` range.
    pub const LIVE: CountBounds = CountBounds { min: 10, max: 100 };

    /// The range used for synthetic demo results.
    pub const DEMO: CountBounds = CountBounds { min: 5, max: 20 };

    /// Creates bounds, checking that `1 <= min <= max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty or zero-based range.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 || min > max {
            return Err(Error::Configuration(format!(
                "invalid count bounds [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Clamps `count` into the range.
    pub fn clamp(&self, count: i64) -> u32 {
        count.clamp(self.min as i64, self.max as i64) as u32
    }
}

/// Whether a fetch goes to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Always call the API. A missing credential is a configuration error.
    Live,
    /// Never call the API; return synthetic results.
    Demo,
    /// Call the API when a credential is available, otherwise return
    /// synthetic results.
    #[default]
    LiveOrDemo,
}

impl FetchMode {
    /// Maps a plain "live mode" flag to a mode.
    ///
    /// `true` requires a live call, `false` selects demo data.
    pub fn from_live_flag(live: bool) -> Self {
        if live {
            FetchMode::Live
        } else {
            FetchMode::Demo
        }
    }
}
