//! Synthetic results for when live data is unavailable or unwanted.

use crate::model::{FetchResult, Record};
use chrono::{DateTime, Duration, Utc};

/// Seconds between consecutive demo records.
pub const DEMO_SPACING_SECS: i64 = 60;

/// Builds `count` synthetic records about `query`.
///
/// Records are newest first, `DEMO_SPACING_SECS` apart starting at `now`, and
/// carry a strictly decreasing relevance score. `count` is used as given;
/// callers clamp it beforehand.
///
/// ```
/// use trendfetch::demo;
/// use chrono::Utc;
///
/// let result = demo::generate("#ai", 3, Utc::now());
/// assert_eq!(result.len(), 3);
/// assert_eq!(result.records[0].relevance, Some(100.0));
/// ```
pub fn generate(query: &str, count: u32, now: DateTime<Utc>) -> FetchResult {
    let records = (0..count)
        .map(|i| {
            let rank = i + 1;
            Record {
                id: format!("demo-{}", rank),
                text: format!("Example post about {} - generated demo #{}", query, rank),
                author_id: None,
                author_username: None,
                author_name: None,
                author_verified: None,
                created_at: Some(now - Duration::seconds(DEMO_SPACING_SECS * i as i64)),
                retweet_count: None,
                reply_count: None,
                like_count: None,
                quote_count: None,
                relevance: Some(relevance(i)),
            }
        })
        .collect();

    FetchResult {
        records,
        meta: None,
    }
}

// Drops by 3 per rank with a 1.5 wobble every third rank; always decreasing.
fn relevance(index: u32) -> f64 {
    100.0 - 3.0 * index as f64 + 1.5 * (index % 3) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_size() {
        let now = Utc::now();
        for count in [0, 1, 5, 20] {
            assert_eq!(generate("q", count, now).len(), count as usize);
        }
    }

    #[test]
    fn test_timestamps_descend_at_fixed_spacing() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let result = generate("q", 10, now);

        assert_eq!(result.records[0].created_at, Some(now));
        for pair in result.records.windows(2) {
            let newer = pair[0].created_at.unwrap();
            let older = pair[1].created_at.unwrap();
            assert_eq!(newer - older, Duration::seconds(DEMO_SPACING_SECS));
        }
    }

    #[test]
    fn test_relevance_strictly_decreasing() {
        let result = generate("q", 20, Utc::now());
        for pair in result.records.windows(2) {
            assert!(pair[0].relevance.unwrap() > pair[1].relevance.unwrap());
        }
        assert_eq!(result.records[1].relevance, Some(98.5));
        assert_eq!(result.records[3].relevance, Some(91.0));
    }

    #[test]
    fn test_text_mentions_query() {
        let result = generate("#rustlang", 2, Utc::now());
        assert_eq!(result.records[1].id, "demo-2");
        assert!(result.records[1].text.contains("#rustlang"));
        assert!(result.records[1].text.ends_with("#2"));
    }
}
