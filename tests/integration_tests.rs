//! Integration tests using wiremock to simulate the search API.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trendfetch::retry::{FixedJitter, RecordingSleeper};
use trendfetch::{
    Client, CountBounds, Credential, Error, FetchMode, FetchSource, QuerySpec, TransportError,
    DEFAULT_SEARCH_PATH,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn credential() -> Credential {
    Credential::new("test-token")
}

fn search_body() -> serde_json::Value {
    json!({
        "data": [
            {
                "id": "1001",
                "text": "Rust 2024 edition is out",
                "author_id": "u1",
                "created_at": "2024-10-17T09:30:00.000Z",
                "public_metrics": {
                    "retweet_count": 12,
                    "reply_count": 3,
                    "like_count": 140,
                    "quote_count": 1
                }
            },
            {
                "id": "1000",
                "text": "async closures when",
                "author_id": "u2",
                "created_at": "2024-10-17T09:29:00.000Z",
                "public_metrics": {
                    "retweet_count": 0,
                    "reply_count": 1,
                    "like_count": 4,
                    "quote_count": 0
                }
            }
        ],
        "includes": {
            "users": [
                { "id": "u1", "username": "rustlang", "name": "Rust Language", "verified": true },
                { "id": "u2", "username": "ferris", "name": "Ferris" }
            ]
        },
        "meta": { "result_count": 2, "newest_id": "1001", "oldest_id": "1000" }
    })
}

fn recording_client(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(sleeper)
        .build()
        .unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_successful_search() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DEFAULT_SEARCH_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("query", "#rust"))
        .and(query_param("max_results", "25"))
        .and(query_param("expansions", "author_id"))
        .and(query_param("tweet.fields", "created_at,public_metrics,author_id"))
        .and(query_param("user.fields", "username,name,verified"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body())
                .insert_header("x-rate-limit-limit", "450")
                .insert_header("x-rate-limit-remaining", "449")
                .insert_header("x-rate-limit-reset", "1729157400"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));
    let spec = QuerySpec::new("#rust", 25).unwrap();

    let fetched = client
        .fetch(&spec, Some(&credential()), FetchMode::Live)
        .await
        .unwrap();

    assert_eq!(fetched.source, FetchSource::Live);
    assert_eq!(fetched.attempts, 1);
    assert!(!fetched.was_retried());

    let ids: Vec<&str> = fetched.result.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1000"]);
    assert_eq!(
        fetched.result.records[0].author_username.as_deref(),
        Some("rustlang")
    );
    assert_eq!(fetched.result.records[0].like_count, Some(140));
    assert_eq!(fetched.result.records[1].author_name.as_deref(), Some("Ferris"));
    assert_eq!(fetched.result.meta.as_ref().unwrap().result_count, 2);

    assert_eq!(fetched.rate_limit.limit, Some(450));
    assert_eq!(fetched.rate_limit.remaining, Some(449));
    assert_eq!(
        fetched.rate_limit.reset_at.map(|t| t.timestamp()),
        Some(1_729_157_400)
    );
}

#[tokio::test]
async fn test_result_count_is_clamped_in_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("max_results", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("max_results", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let too_many = client
        .fetch_query("rust", 5000, Some(&credential()), true)
        .await
        .unwrap();
    assert!(too_many.result.is_empty());

    let too_few = client
        .fetch_query("rust", 2, Some(&credential()), true)
        .await
        .unwrap();
    assert!(too_few.result.is_empty());
}

#[tokio::test]
async fn test_blank_query_makes_no_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    for text in ["", "   ", "\n\t"] {
        let result = client.fetch_query(text, 10, Some(&credential()), true).await;
        match result {
            Err(Error::Validation(_)) => {}
            _ => panic!("Expected Validation, got {:?}", result),
        }
    }

    let result = client.fetch_query("rust", 0, Some(&credential()), true).await;
    assert!(matches!(result, Err(Error::Validation(_))));

    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_retry_after_is_honored_on_429() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests are rate limited, third succeeds
    Mock::given(method("GET"))
        .and(path(DEFAULT_SEARCH_PATH))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .insert_header("x-rate-limit-remaining", "0")
                    .set_body_string("Too Many Requests")
            } else {
                ResponseTemplate::new(200).set_body_json(search_body())
            }
        })
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = recording_client(&mock_server, sleeper.clone());
    let spec = QuerySpec::new("#rust", 10).unwrap();

    let fetched = client
        .fetch(&spec, Some(&credential()), FetchMode::Live)
        .await
        .unwrap();

    assert_eq!(fetched.attempts, 3);
    assert!(fetched.was_retried());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_secs(2), Duration::from_secs(2)]
    );

    assert_eq!(fetched.result.len(), 2);
    assert_eq!(
        fetched.result.records[1].author_username.as_deref(),
        Some("ferris")
    );
    assert_eq!(fetched.result.records[1].reply_count, Some(1));
}

#[tokio::test]
async fn test_retry_after_waits_in_real_time() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429).insert_header("retry-after", "1")
            } else {
                ResponseTemplate::new(200).set_body_json(search_body())
            }
        })
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .jitter(Arc::new(FixedJitter(0.0)))
        .backoff_base(Duration::from_millis(10))
        .build()
        .unwrap();

    let start = std::time::Instant::now();
    let fetched = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();

    assert_eq!(fetched.attempts, 2);
    // Retry-After of 1s, not the 10ms backoff
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_429_without_retry_after_uses_backoff() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(429).set_body_string("slow down")
            } else {
                ResponseTemplate::new(200).set_body_json(search_body())
            }
        })
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = recording_client(&mock_server, sleeper.clone());

    let fetched = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();

    assert_eq!(fetched.attempts, 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_exhausted_retries_on_503() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(5)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = recording_client(&mock_server, sleeper.clone());

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    match result {
        Err(Error::ExhaustedRetries {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 5);
            match *last_error {
                TransportError::Server {
                    status,
                    ref body_excerpt,
                    ..
                } => {
                    assert_eq!(status.as_u16(), 503);
                    assert_eq!(body_excerpt, "Service Unavailable");
                }
                ref other => panic!("Expected Server error, got {:?}", other),
            }
        }
        other => panic!("Expected ExhaustedRetries, got {:?}", other),
    }

    assert_eq!(request_count(&mock_server).await, 5);

    // No wait after the final attempt; each window longer than the last
    let waits = sleeper.waits();
    assert_eq!(
        waits,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]
    );
    assert!(waits.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_404_is_fatal_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = recording_client(&mock_server, sleeper.clone());

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    match result {
        Err(Error::FatalApi {
            status,
            ref body_excerpt,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body_excerpt, "Not found");
        }
        _ => panic!("Expected FatalApi, got {:?}", result),
    }

    assert_eq!(request_count(&mock_server).await, 1);
    assert!(sleeper.waits().is_empty());
}

#[tokio::test]
async fn test_fatal_error_carries_rate_limit_info() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-Rate-Limit-Remaining", "0")
                .set_body_string("Forbidden"),
        )
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let err = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));
    assert_eq!(err.rate_limit_info().and_then(|i| i.remaining), Some(0));
    assert!(!err.is_caller_error());
}

#[tokio::test]
async fn test_demo_mode_without_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let fetched = client.fetch_query("#ai", 50, None, false).await.unwrap();

    assert_eq!(fetched.source, FetchSource::Demo);
    assert_eq!(fetched.result.len(), CountBounds::DEMO.max as usize);
    assert!(fetched.rate_limit.is_empty());
    assert_eq!(fetched.attempts, 0);

    let timestamps: Vec<_> = fetched
        .result
        .iter()
        .map(|r| r.created_at.unwrap())
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] > pair[1]));

    let small = client.fetch_query("#ai", 1, None, false).await.unwrap();
    assert_eq!(small.result.len(), CountBounds::DEMO.min as usize);

    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_demo_mode_ignores_credential() {
    let mock_server = MockServer::start().await;
    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let fetched = client
        .fetch_query("#ai", 7, Some(&credential()), false)
        .await
        .unwrap();

    assert!(fetched.is_demo());
    assert_eq!(fetched.result.len(), 7);
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_live_mode_requires_credential() {
    let mock_server = MockServer::start().await;
    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));
    let spec = QuerySpec::new("#ai", 10).unwrap();

    let result = client.fetch(&spec, None, FetchMode::Live).await;
    assert!(matches!(result, Err(Error::Configuration(_))));

    let blank = Credential::new("   ");
    let result = client.fetch(&spec, Some(&blank), FetchMode::Live).await;
    assert!(matches!(result, Err(Error::Configuration(_))));

    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_live_or_demo_falls_back_without_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));
    let spec = QuerySpec::new("#ai", 10).unwrap();

    let demo = client
        .fetch(&spec, None, FetchMode::LiveOrDemo)
        .await
        .unwrap();
    assert!(demo.is_demo());

    let live = client
        .fetch(&spec, Some(&credential()), FetchMode::LiveOrDemo)
        .await
        .unwrap();
    assert_eq!(live.source, FetchSource::Live);
}

#[tokio::test]
async fn test_missing_author_does_not_fail_batch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "1", "text": "known", "author_id": "u1" },
                { "id": "2", "text": "orphan", "author_id": "deleted-user" },
                { "id": "3", "text": "known again", "author_id": "u1",
                  "public_metrics": { "like_count": 9 } }
            ],
            "includes": { "users": [{ "id": "u1", "username": "ferris" }] }
        })))
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let fetched = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();

    let records = &fetched.result.records;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].author_username.as_deref(), Some("ferris"));
    assert!(records[1].author_username.is_none());
    assert_eq!(records[1].text, "orphan");
    assert_eq!(records[2].author_username.as_deref(), Some("ferris"));
    assert_eq!(records[2].like_count, Some(9));
}

#[tokio::test]
async fn test_rate_limit_header_spellings_agree() {
    let lower = MockServer::start().await;
    let capitalized = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body())
                .insert_header("x-rate-limit-remaining", "42")
                .insert_header("x-rate-limit-limit", "180"),
        )
        .mount(&lower)
        .await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body())
                .insert_header("X-Rate-Limit-Remaining", "42")
                .insert_header("X-RateLimit-Limit", "180"),
        )
        .mount(&capitalized)
        .await;

    let a = recording_client(&lower, Arc::new(RecordingSleeper::new()))
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();
    let b = recording_client(&capitalized, Arc::new(RecordingSleeper::new()))
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();

    assert_eq!(a.rate_limit, b.rate_limit);
    assert_eq!(a.rate_limit.remaining, Some(42));
    assert_eq!(a.rate_limit.limit, Some(180));
}

#[tokio::test]
async fn test_deadline_stops_retry_loop() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(sleeper.clone())
        .deadline(Duration::from_secs(3))
        .build()
        .unwrap();

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    // 1s and 2s fit inside the deadline, the 4s wait after attempt 3 does not
    match result {
        Err(Error::DeadlineExceeded {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(
                last_error.and_then(|e| e.status()).map(|s| s.as_u16()),
                Some(502)
            );
        }
        other => panic!("Expected DeadlineExceeded, got {:?}", other),
    }
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_attempt_timeout_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .max_attempts(2)
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    match result {
        Err(Error::ExhaustedRetries {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last_error, TransportError::Timeout));
        }
        other => panic!("Expected ExhaustedRetries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deadline_shortens_attempt_timeout() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    // The 15 second attempt timeout must give way to the 300ms deadline
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .deadline(Duration::from_millis(300))
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();

    let start = std::time::Instant::now();
    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;
    let elapsed = start.elapsed();

    match result {
        Err(Error::DeadlineExceeded {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 1);
            assert!(matches!(last_error.as_deref(), Some(TransportError::Timeout)));
        }
        other => panic!("Expected DeadlineExceeded, got {:?}", other),
    }
    assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_connection_error_is_retried() {
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .max_attempts(3)
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    match result {
        Err(Error::ExhaustedRetries {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last_error, TransportError::Connection(_)));
        }
        other => panic!("Expected ExhaustedRetries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deserialization_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = recording_client(&mock_server, Arc::new(RecordingSleeper::new()));

    let result = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await;

    match result {
        Err(Error::DeserializationFailed {
            status,
            raw_response,
            serde_error,
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_no_content_is_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204).insert_header("x-rate-limit-remaining", "12"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::new());
    let client = recording_client(&mock_server, sleeper.clone());

    let fetched = client
        .fetch_query("rust", 10, Some(&credential()), true)
        .await
        .unwrap();

    assert!(fetched.result.is_empty());
    assert!(fetched.result.meta.is_none());
    assert_eq!(fetched.source, FetchSource::Live);
    assert_eq!(fetched.attempts, 1);
    assert_eq!(fetched.rate_limit.remaining, Some(12));
    assert!(sleeper.waits().is_empty());
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "trend-dashboard/1.0"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("User-Agent", "trend-dashboard/1.0")
        .unwrap()
        .build()
        .unwrap();

    let prefixed = Credential::new("Bearer test-token");
    let fetched = client
        .fetch_query("rust", 10, Some(&prefixed), true)
        .await
        .unwrap();
    assert_eq!(fetched.result.len(), 2);
}

#[tokio::test]
async fn test_concurrent_fetches_keep_separate_budgets() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .max_attempts(2)
        .jitter(Arc::new(FixedJitter(0.0)))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();

    let cred_a = credential();
    let cred_b = credential();
    let (a, b) = tokio::join!(
        client.fetch_query("rust", 10, Some(&cred_a), true),
        client.fetch_query("tokio", 10, Some(&cred_b), true),
    );

    assert_eq!(a.unwrap_err().attempts(), Some(2));
    assert_eq!(b.unwrap_err().attempts(), Some(2));
    assert_eq!(request_count(&mock_server).await, 4);
}
