//! Search records and the join from the API's wire shape.
//!
//! The recent-search endpoint returns posts in `data` and the authors they
//! reference in `includes.users`. [`normalize`] joins the two by author id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One search result, ready for a table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The post id
    pub id: String,
    /// The post body
    pub text: String,
    /// Id of the posting account, if the API reported one
    pub author_id: Option<String>,
    /// Set only when the author was present in the response's includes.
    pub author_username: Option<String>,
    /// Display name of the author, joined like `author_username`
    pub author_name: Option<String>,
    /// Whether the author is verified, joined like `author_username`
    pub author_verified: Option<bool>,
    /// When the post was created
    pub created_at: Option<DateTime<Utc>>,
    /// Repost count from the post's public metrics
    pub retweet_count: Option<u64>,
    /// Reply count from the post's public metrics
    pub reply_count: Option<u64>,
    /// Like count from the post's public metrics
    pub like_count: Option<u64>,
    /// Quote count from the post's public metrics
    pub quote_count: Option<u64>,
    /// Synthetic ranking score. Only demo records carry one.
    pub relevance: Option<f64>,
}

/// Paging metadata the API returns next to the results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Number of posts in this page
    #[serde(default)]
    pub result_count: u64,
    /// Id of the newest post in this page
    pub newest_id: Option<String>,
    /// Id of the oldest post in this page
    pub oldest_id: Option<String>,
    /// Token for the next page, absent on the last one
    pub next_token: Option<String>,
}

/// The records of one fetch, in the order the API returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The normalized records
    pub records: Vec<Record>,
    /// Paging metadata. `None` for demo results and bodiless responses.
    pub meta: Option<SearchMeta>,
}

impl FetchResult {
    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the fetch produced no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in API order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for FetchResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FetchResult {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    data: Vec<WirePost>,
    #[serde(default)]
    includes: Includes,
    meta: Option<SearchMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    retweet_count: Option<u64>,
    reply_count: Option<u64>,
    like_count: Option<u64>,
    quote_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: Option<String>,
    name: Option<String>,
    verified: Option<bool>,
}

/// Joins posts with their authors.
///
/// A post whose author is missing from the includes keeps its `author_id`
/// and leaves the other author fields unset.
pub(crate) fn normalize(response: SearchResponse) -> FetchResult {
    let SearchResponse {
        data,
        includes,
        meta,
    } = response;

    let users: HashMap<&str, &WireUser> = includes
        .users
        .iter()
        .map(|user| (user.id.as_str(), user))
        .collect();

    let records = data
        .into_iter()
        .map(|post| {
            let author = post
                .author_id
                .as_deref()
                .and_then(|id| users.get(id).copied());
            let metrics = post.public_metrics.unwrap_or_default();

            if post.author_id.is_some() && author.is_none() {
                tracing::debug!(
                    post_id = %post.id,
                    "Author missing from includes"
                );
            }

            Record {
                author_username: author.and_then(|u| u.username.clone()),
                author_name: author.and_then(|u| u.name.clone()),
                author_verified: author.and_then(|u| u.verified),
                id: post.id,
                text: post.text,
                author_id: post.author_id,
                created_at: post.created_at,
                retweet_count: metrics.retweet_count,
                reply_count: metrics.reply_count,
                like_count: metrics.like_count,
                quote_count: metrics.quote_count,
                relevance: None,
            }
        })
        .collect();

    FetchResult { records, meta }
}
