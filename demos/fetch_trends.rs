//! Fetches recent posts for a query and prints them with the quota state.
//!
//! Uses the `X_API_KEY` environment variable when set and falls back to demo
//! data otherwise.
//!
//! Run with: `cargo run --example fetch_trends -- "#rustlang" 25`

use chrono::Utc;
use trendfetch::{Client, Credential, Error, FetchMode, QuerySpec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("trendfetch=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(|| "#ai".to_string());
    let count = args.next().and_then(|c| c.parse().ok()).unwrap_or(10);

    let credential = std::env::var("X_API_KEY").ok().and_then(Credential::non_empty);
    let client = Client::builder()
        .default_header("User-Agent", "trendfetch-demo/0.1")?
        .build()?;
    let spec = QuerySpec::new(query, count)?;

    match client
        .fetch(&spec, credential.as_ref(), FetchMode::LiveOrDemo)
        .await
    {
        Ok(fetched) => {
            if fetched.is_demo() {
                println!("Showing demo data. Set X_API_KEY to fetch live results.\n");
            }
            if fetched.result.is_empty() {
                println!("No results for {}", spec.text());
            }
            for record in &fetched.result {
                println!(
                    "{:>20}  {:<16}  likes={:<6}  {}",
                    record.id,
                    record.author_username.as_deref().unwrap_or("-"),
                    record.like_count.map_or("-".to_string(), |n| n.to_string()),
                    record.text.replace('\n', " "),
                );
            }

            let info = &fetched.rate_limit;
            println!();
            println!("Rate limit: {:?}", info.limit);
            println!("Remaining:  {:?}", info.remaining);
            if let Some(reset_in) = info.reset_in(Utc::now()) {
                println!("Reset in:   {:.2} min", reset_in.as_secs_f64() / 60.0);
            }
        }
        Err(e @ (Error::Configuration(_) | Error::Validation(_))) => {
            eprintln!("Configuration error: {}", e);
        }
        Err(e) => {
            eprintln!("Network/API error: {}", e);
            if let Some(info) = e.rate_limit_info() {
                eprintln!("  remaining={:?} retry_after={:?}", info.remaining, info.retry_after);
            }
        }
    }

    Ok(())
}
